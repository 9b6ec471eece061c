//
// Copyright 2020-2021 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! A bridge that lets a CLR host (host B) reach into a running JVM (host A).
//!
//! Host A enters the bridge once through [`initialize`]; host B then receives a set of C-ABI
//! functions ([`HostExports`]) for looking up classes and methods, constructing instances,
//! resolving return types, and calling methods through the typed trampolines of [`CallTable`].

#![allow(clippy::missing_safety_doc)]
#![deny(clippy::unwrap_used)]

#[macro_use]
pub mod jni;

mod support;
pub use support::{c_str_arg, describe_panic};

pub mod accessors;
pub mod clr;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod dispatch;
pub mod exports;
pub mod logging;
pub mod resolve;

pub use accessors::{construct_instance, lookup_class, lookup_method};
pub use clr::{ClrLibrary, ClrMainFn, HostBootstrap, LinkedEntryPoint};
pub use config::BridgeConfig;
pub use context::{install, installed, uninstall, BridgeContext};
pub use descriptor::{MethodDescriptor, ReturnCategory};
pub use dispatch::{invoke, CallTable, JavaValue, CALL_TABLE};
pub use exports::{initialize, HostExports};
pub use resolve::{resolve_return_type, JvmSignatureOracle, SignatureOracle};
