//! The helper-call bridge: `CALL imm` invokes a host-registered
//! [`Helper`] by numeric id, passing `R1..R5` as arguments and
//! returning its result in `R0`.

use std::collections::HashMap;
use std::fmt;

use crate::error::{Fault, HelperError};

/// A host-provided function reachable from a program via `CALL`.
///
/// Modeled as a trait rather than a bare function pointer so a helper
/// can carry state (a packet buffer, a counter, an RNG) across calls.
pub trait Helper {
    fn call(&self, args: [u64; 5]) -> Result<u64, HelperError>;
}

/// A helper built from a plain closure, for tests and simple hosts
/// that don't need to carry state.
pub struct FnHelper<F>(pub F)
where
    F: Fn([u64; 5]) -> Result<u64, HelperError>;

impl<F> Helper for FnHelper<F>
where
    F: Fn([u64; 5]) -> Result<u64, HelperError>,
{
    fn call(&self, args: [u64; 5]) -> Result<u64, HelperError> {
        (self.0)(args)
    }
}

/// The set of helpers a host makes available to a running program,
/// indexed by the numeric id a `CALL imm` names.
#[derive(Default)]
pub struct HelperRegistry {
    helpers: HashMap<u32, Box<dyn Helper>>,
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `helper` under `id`, replacing any previous registrant.
    pub fn register(&mut self, id: u32, helper: Box<dyn Helper>) {
        self.helpers.insert(id, helper);
    }

    /// Register a plain closure under `id`.
    pub fn register_fn<F>(&mut self, id: u32, f: F)
    where
        F: Fn([u64; 5]) -> Result<u64, HelperError> + 'static,
    {
        self.register(id, Box::new(FnHelper(f)));
    }

    /// Invoke the helper registered under `id`, or fault with
    /// [`Fault::UnknownHelper`] if none is.
    pub fn invoke(&self, id: u32, args: [u64; 5]) -> Result<u64, Fault> {
        let helper = self.helpers.get(&id).ok_or(Fault::UnknownHelper { id })?;
        helper.call(args).map_err(Fault::from)
    }
}

impl fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("registered", &self.helpers.len())
            .finish()
    }
}
