// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Declarative macros shared across the workspace.
//!
//! - [`simple_display!`] — wire-name `Display` impls for the state enums
//!   ([`TaskPhase`](crate::task::TaskPhase) prints `"executing"`,
//!   [`SessionStatus`](crate::session::SessionStatus) prints `"idle"`, …)
//! - [`builder!`] — fixture builders behind the `test-support` feature
//!   (`Task::builder().id("PIFA-1").phase(TaskPhase::Ready).build()`)
//! - [`setters!`] — chained setters on production config structs
//!   ([`ModelConfig`](crate::model::ModelConfig)`::thinking_level`,
//!   `SessionSpec::extensions` in `tf-runtime`)

/// Generate a `Display` impl mapping enum variants to their wire names.
///
/// The wire name is what lands in frontmatter, journal records, and log
/// lines, so it must match the serde rename for the same variant. Unit
/// variants match bare; data-carrying variants take `(..)`.
///
/// ```ignore
/// crate::simple_display! {
///     TaskPhase {
///         Backlog => "backlog",
///         Executing => "executing",
///     }
/// }
/// ```
#[macro_export]
macro_rules! simple_display {
    ($ty:ty { $( $var:ident $(( $($skip:tt)* ))? => $text:expr ),+ $(,)? }) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let text = match self {
                    $( Self::$var $(( $($skip)* ))? => $text, )+
                };
                f.write_str(text)
            }
        }
    };
}

/// Generate a fixture builder: a companion struct with per-field setters,
/// a `Default` impl carrying test defaults, and `build()`.
///
/// Everything generated is gated behind `#[cfg(any(test, feature =
/// "test-support"))]` so fixtures never reach release builds. Fields are
/// declared in groups:
///
/// - `into { field: Type = default }` — setter takes `impl Into<Type>`
///   (ids and titles: `.id("PIFA-7")`)
/// - `set { field: Type = default }` — setter takes `Type` as-is
///   (`.phase(TaskPhase::Ready)`, `.order(3)`)
/// - `option { field: Type = default }` — target field is `Option<Type>`,
///   the setter wraps: `.session_file("sess.jsonl")` stores `Some(..)`
/// - `computed { field: Type = expr }` — no setter; evaluated at `build()`
///
/// ```ignore
/// crate::builder! {
///     pub struct TaskBuilder => Task {
///         into { id: TaskId = "TASK-1" }
///         set { phase: TaskPhase = TaskPhase::Backlog }
///         option { plan: Plan = None }
///     }
/// }
/// ```
#[macro_export]
macro_rules! builder {
    (
        pub struct $name:ident => $out:ident {
            $(into {
                $( $ifield:ident : $ity:ty = $idefault:expr ),* $(,)?
            })?
            $(set {
                $( $sfield:ident : $sty:ty = $sdefault:expr ),* $(,)?
            })?
            $(option {
                $( $ofield:ident : $oty:ty = $odefault:expr ),* $(,)?
            })?
            $(computed {
                $( $cfield:ident : $cty:ty = $cexpr:expr ),* $(,)?
            })?
        }
    ) => {
        #[cfg(any(test, feature = "test-support"))]
        pub struct $name {
            $($( $ifield: $ity, )*)?
            $($( $sfield: $sty, )*)?
            $($( $ofield: Option<$oty>, )*)?
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $out {
            /// Start a builder preloaded with fixture defaults.
            pub fn builder() -> $name {
                $name::default()
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($( $ifield: $idefault.into(), )*)?
                    $($( $sfield: $sdefault, )*)?
                    $($( $ofield: $odefault, )*)?
                }
            }
        }

        #[cfg(any(test, feature = "test-support"))]
        impl $name {
            pub fn build(self) -> $out {
                $out {
                    $($( $ifield: self.$ifield, )*)?
                    $($( $sfield: self.$sfield, )*)?
                    $($( $ofield: self.$ofield, )*)?
                    $($( $cfield: $cexpr, )*)?
                }
            }

            $($(
                pub fn $ifield(mut self, value: impl Into<$ity>) -> Self {
                    self.$ifield = value.into();
                    self
                }
            )*)?

            $($(
                pub fn $sfield(mut self, value: $sty) -> Self {
                    self.$sfield = value;
                    self
                }
            )*)?

            $($(
                pub fn $ofield(mut self, value: impl Into<$oty>) -> Self {
                    self.$ofield = Some(value.into());
                    self
                }
            )*)?
        }
    };
}

/// Generate chained setters inside an existing `impl` block.
///
/// Same field groups as [`builder!`] minus defaults and `computed` — the
/// struct already exists, only the setters are produced. Used where a
/// config type starts from a small `new()` and callers layer options on:
///
/// ```ignore
/// impl ModelConfig {
///     tf_core::setters! {
///         option { thinking_level: ThinkingLevel }
///     }
/// }
/// ```
#[macro_export]
macro_rules! setters {
    (
        $(into {
            $( $ifield:ident : $ity:ty ),* $(,)?
        })?
        $(set {
            $( $sfield:ident : $sty:ty ),* $(,)?
        })?
        $(option {
            $( $ofield:ident : $oty:ty ),* $(,)?
        })?
    ) => {
        $($(
            pub fn $ifield(mut self, value: impl Into<$ity>) -> Self {
                self.$ifield = value.into();
                self
            }
        )*)?

        $($(
            pub fn $sfield(mut self, value: $sty) -> Self {
                self.$sfield = value;
                self
            }
        )*)?

        $($(
            pub fn $ofield(mut self, value: impl Into<$oty>) -> Self {
                self.$ofield = Some(value.into());
                self
            }
        )*)?
    };
}
