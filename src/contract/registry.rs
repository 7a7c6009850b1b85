//! Service contract registry: operation name to typed invocation thunk.
//!
//! The registry is built once per contract and shared by every connection.
//! Lookup is by stable name; argument decoding and result encoding happen
//! inside each registered thunk, so dispatch never inspects types at runtime.
//!
//! # Example
//!
//! ```
//! use wirecall::contract::{Method, Reply, ServiceContract};
//!
//! struct Calculator;
//!
//! const ADD: Method<(i64, i64), i64> = Method::new("Add");
//!
//! let contract = ServiceContract::<Calculator>::builder("Calculator")
//!     .operation(&ADD, |_calc, (a, b)| Reply::ready(a + b))
//!     .build();
//!
//! assert!(contract.resolve("Add").is_ok());
//! assert!(contract.resolve("DoesNotExist").is_err());
//! ```

use std::any::TypeId;
use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;

use super::{Arguments, Method, Reply};
use crate::codec::MsgPackCodec;
use crate::error::{Result, RpcError};
use crate::protocol::{Blob, Envelope};
use crate::transport::BoxFuture;

/// Encoded result: `None` when the operation returns nothing.
pub type ResultBytes = Option<Vec<u8>>;

/// Type-erased operation invoker.
pub trait Invoker<W>: Send + Sync + 'static {
    /// Decode `args`, run the operation on `worker`, and encode its value.
    fn call(&self, worker: Arc<W>, args: &[Blob]) -> BoxFuture<'static, Result<ResultBytes>>;
}

/// Wrapper that decodes arguments before calling the handler.
pub struct TypedOperation<F, P, R> {
    name: &'static str,
    handler: F,
    _phantom: PhantomData<fn(P) -> R>,
}

impl<F, P, R> TypedOperation<F, P, R> {
    /// Create a new typed operation.
    pub fn new(name: &'static str, handler: F) -> Self {
        Self {
            name,
            handler,
            _phantom: PhantomData,
        }
    }
}

impl<W, F, P, R> Invoker<W> for TypedOperation<F, P, R>
where
    W: Send + Sync + 'static,
    F: Fn(Arc<W>, P) -> Reply<R> + Send + Sync + 'static,
    P: Arguments,
    R: Serialize + Send + 'static,
{
    fn call(&self, worker: Arc<W>, args: &[Blob]) -> BoxFuture<'static, Result<ResultBytes>> {
        let params = match P::decode(self.name, args) {
            Ok(p) => p,
            Err(e) => return Box::pin(async move { Err(e) }),
        };

        let reply = (self.handler)(worker, params);
        let name = self.name;

        Box::pin(async move {
            let value = reply
                .resolve()
                .await
                .map_err(|source| RpcError::InvocationFailed {
                    operation: name.to_string(),
                    source,
                })?;
            encode_result(&value)
        })
    }
}

fn encode_result<R: Serialize + 'static>(value: &R) -> Result<ResultBytes> {
    if TypeId::of::<R>() == TypeId::of::<()>() {
        return Ok(None);
    }
    MsgPackCodec::encode(value).map(Some)
}

/// A resolved operation.
pub struct Operation<W> {
    name: &'static str,
    arity: usize,
    invoker: Box<dyn Invoker<W>>,
}

impl<W> Operation<W> {
    /// Operation name.
    #[inline]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Declared parameter count.
    #[inline]
    pub fn arity(&self) -> usize {
        self.arity
    }
}

/// Registry mapping operation names to invokers for worker type `W`.
pub struct ServiceContract<W> {
    name: String,
    operations: HashMap<&'static str, Operation<W>>,
}

impl<W: Send + Sync + 'static> ServiceContract<W> {
    /// Start building a contract.
    pub fn builder(name: impl Into<String>) -> ContractBuilder<W> {
        ContractBuilder::new(name)
    }

    /// Contract name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True if no operations are registered.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Look up an operation by name.
    pub fn resolve(&self, operation: &str) -> Result<&Operation<W>> {
        self.operations
            .get(operation)
            .ok_or_else(|| RpcError::UnknownOperation(operation.to_string()))
    }

    /// Invoke a resolved operation.
    ///
    /// Zero-parameter operations ignore `args`. Otherwise at least `arity`
    /// blobs are required; extra blobs are ignored.
    pub async fn invoke(
        &self,
        worker: &Arc<W>,
        handle: &Operation<W>,
        args: &[Blob],
    ) -> Result<ResultBytes> {
        if handle.arity > 0 && args.len() < handle.arity {
            return Err(RpcError::ArityMismatch {
                operation: handle.name.to_string(),
                expected: handle.arity,
                actual: args.len(),
            });
        }

        handle.invoker.call(Arc::clone(worker), args).await
    }

    /// Resolve, invoke, and wrap the result in a response envelope.
    pub async fn dispatch(&self, worker: &Arc<W>, request: &Envelope) -> Result<Envelope> {
        let handle = self.resolve(&request.operation)?;
        let result = self.invoke(worker, handle, &request.arguments).await?;
        Ok(Envelope::for_response(handle.name, result))
    }

    /// Worker-independent description for clients.
    pub fn info(&self) -> ContractInfo {
        ContractInfo {
            name: self.name.clone(),
            operations: self
                .operations
                .values()
                .map(|op| (op.name.to_string(), op.arity))
                .collect(),
        }
    }
}

/// Fluent builder for [`ServiceContract`].
pub struct ContractBuilder<W> {
    contract: ServiceContract<W>,
}

impl<W: Send + Sync + 'static> ContractBuilder<W> {
    fn new(name: impl Into<String>) -> Self {
        Self {
            contract: ServiceContract {
                name: name.into(),
                operations: HashMap::new(),
            },
        }
    }

    /// Register the handler for `method`.
    ///
    /// Registering the same name twice keeps the later handler.
    pub fn operation<P, R, F>(mut self, method: &Method<P, R>, handler: F) -> Self
    where
        P: Arguments,
        R: Serialize + Send + 'static,
        F: Fn(Arc<W>, P) -> Reply<R> + Send + Sync + 'static,
    {
        let name = method.name();
        let operation = Operation {
            name,
            arity: P::ARITY,
            invoker: Box::new(TypedOperation::new(name, handler)),
        };

        if self.contract.operations.insert(name, operation).is_some() {
            tracing::warn!(contract = %self.contract.name, operation = name, "Operation registered twice");
        }
        self
    }

    /// Finish building.
    pub fn build(self) -> ServiceContract<W> {
        self.contract
    }
}

/// Names and arities of a contract's operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInfo {
    name: String,
    operations: BTreeMap<String, usize>,
}

impl ContractInfo {
    /// Empty description.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operations: BTreeMap::new(),
        }
    }

    /// Add a method.
    pub fn with_method<P: Arguments, R>(mut self, method: &Method<P, R>) -> Self {
        self.operations.insert(method.name().to_string(), P::ARITY);
        self
    }

    /// Contract name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared arity of `operation`, if it exists.
    pub fn arity(&self, operation: &str) -> Option<usize> {
        self.operations.get(operation).copied()
    }

    /// True if the contract has `operation`.
    pub fn contains(&self, operation: &str) -> bool {
        self.operations.contains_key(operation)
    }

    /// Operation names in sorted order.
    pub fn operations(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }
}
