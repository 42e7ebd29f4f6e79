//! # Navigator
//!
//! Root factory for [`DbgObject`]s. A navigator pairs one
//! [`SymbolService`] with one frozen [`Registry`]; every handle it creates,
//! and every handle derived from those, shares both.

use std::fmt;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tracing::debug;

use crate::error::{NavError, NavResult};
use crate::object::DbgObject;
use crate::registry::Registry;
use crate::symbols::SymbolService;
use crate::types::{Address, BigValue, StackFrame, TypeDescriptor};

/// Number of call-stack frames searched by [`Navigator::locals`].
pub const LOCALS_STACK_DEPTH: usize = 20;

struct NavigatorInner
{
    symbols: Arc<dyn SymbolService>,
    registry: Registry,
}

/// Entry point for navigating one debuggee
///
/// Cloning is cheap: clones share the same symbol service and registry.
///
/// ## Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use dbgnav_core::registry::RegistryBuilder;
/// use dbgnav_core::snapshot::SnapshotSymbols;
/// use dbgnav_core::Navigator;
///
/// # async fn run() -> dbgnav_core::NavResult<()> {
/// let symbols = SnapshotSymbols::from_json(&std::fs::read_to_string("dump.json").unwrap())?;
/// let nav = Navigator::new(Arc::new(symbols), RegistryBuilder::new().build());
/// let head = nav.global("app", "g_list", None).await?;
/// let count = head.f("count").await?.val().await?;
/// println!("{count:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Navigator
{
    inner: Arc<NavigatorInner>,
}

impl fmt::Debug for Navigator
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.debug_struct("Navigator")
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl Navigator
{
    /// Create a navigator over `symbols`, configured by `registry`.
    pub fn new(symbols: Arc<dyn SymbolService>, registry: Registry) -> Self
    {
        Self {
            inner: Arc::new(NavigatorInner { symbols, registry }),
        }
    }

    /// The symbol service every round trip goes to.
    pub fn symbols(&self) -> &dyn SymbolService
    {
        self.inner.symbols.as_ref()
    }

    /// The frozen configuration.
    pub fn registry(&self) -> &Registry
    {
        &self.inner.registry
    }

    /// Parse `module!type` into a normalised descriptor.
    pub fn type_descriptor(&self, text: &str) -> TypeDescriptor
    {
        self.registry().normalize(&TypeDescriptor::parse(text, ""))
    }

    /// A handle of type `ty` at `address`. No round trip.
    pub fn create(&self, ty: &TypeDescriptor, address: Address) -> DbgObject
    {
        DbgObject::from_parts(self.clone(), self.registry().normalize(ty), address, None, None, false)
    }

    /// The NULL handle: untyped, at address zero.
    pub fn null(&self) -> DbgObject
    {
        DbgObject::from_parts(self.clone(), TypeDescriptor::void(""), Address::ZERO, None, None, false)
    }

    /// A global variable.
    ///
    /// ## Errors
    ///
    /// `LookupFailure` if the symbol is unknown.
    pub async fn global(&self, module: &str, symbol: &str, type_name: Option<&str>) -> NavResult<DbgObject>
    {
        let module = self.registry().normalize_module(module);
        debug!("Looking up global {}!{}", module, symbol);
        let global = self.symbols().lookup_global_symbol(&module, symbol, type_name).await?;
        let ty = TypeDescriptor::new(global.module, &global.type_name);
        Ok(self.create(&ty, global.address))
    }

    /// Every local called `symbol` in frames of `module!method` on the
    /// current call stack (searching the innermost frames only).
    ///
    /// Frames whose instruction address cannot be symbolised are skipped.
    pub async fn locals(&self, module: &str, method: &str, symbol: &str) -> NavResult<Vec<DbgObject>>
    {
        let frames = self.symbols().get_call_stack(LOCALS_STACK_DEPTH).await?;
        let module = self.registry().normalize_module(module);

        let matches = join_all(frames.iter().map(|frame| self.frame_is_in(*frame, &module, method))).await;
        let frames: Vec<StackFrame> = frames
            .into_iter()
            .zip(matches)
            .filter_map(|(frame, matched)| matched.then_some(frame))
            .collect();
        debug!("{} of the stack frames are in {}!{}", frames.len(), module, method);

        let locals = try_join_all(
            frames
                .into_iter()
                .map(|frame| self.symbols().lookup_locals_in_stack_frame(frame)),
        )
        .await?;

        Ok(locals
            .into_iter()
            .flatten()
            .filter(|local| local.name == symbol)
            .map(|local| self.create(&TypeDescriptor::new(local.module, &local.type_name), local.address))
            .collect())
    }

    async fn frame_is_in(&self, frame: StackFrame, module: &str, method: &str) -> bool
    {
        match self.symbols().lookup_symbol_name(frame.instruction_address).await {
            Ok(info) => self.registry().normalize_module(&info.module) == module && info.name == method,
            Err(_) => false,
        }
    }

    /// The `module!name` of the symbol starting exactly at `address`.
    ///
    /// ## Errors
    ///
    /// `LookupFailure` if no symbol starts at `address`.
    pub async fn symbol(&self, address: Address) -> NavResult<String>
    {
        let info = self.symbols().lookup_symbol_name(address).await?;
        if info.displacement == 0 {
            Ok(format!("{}!{}", self.registry().normalize_module(&info.module), info.name))
        } else {
            Err(NavError::lookup(format!("{address} is not a valid symbol address")))
        }
    }

    /// Value of the constant `name` of type `ty`.
    pub async fn constant_value(&self, ty: &TypeDescriptor, name: &str) -> NavResult<BigValue>
    {
        self.symbols()
            .lookup_constant_value(ty.module(), Some(ty.name()), name)
            .await
    }

    /// Value of a module-level constant.
    pub async fn global_constant_value(&self, module: &str, name: &str) -> NavResult<BigValue>
    {
        let module = self.registry().normalize_module(module);
        self.symbols().lookup_constant_value(&module, None, name).await
    }

    /// Names of the module-level constants with `value`.
    pub async fn global_constant_names(&self, module: &str, value: BigValue) -> NavResult<Vec<String>>
    {
        let module = self.registry().normalize_module(module);
        self.symbols().lookup_constant_name(&module, None, value).await
    }
}
