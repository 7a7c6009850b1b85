//! Contract module - typed operation descriptors and the dispatch registry.
//!
//! Provides:
//! - [`Method`] - typed, name-carrying reference to one operation
//! - [`Arguments`] - parameter tuples and their per-argument blobs
//! - [`Reply`] - immediate or deferred operation results
//! - [`ServiceContract`] - maps names to invokers for a worker type
//! - [`ContractInfo`] - names and arities, for client-side checks
//!
//! # Example
//!
//! ```
//! use wirecall::contract::{ContractInfo, Method, Reply, ServiceContract};
//!
//! struct Greeter {
//!     greeting: String,
//! }
//!
//! const GREET: Method<(String,), String> = Method::new("Greet");
//!
//! let contract = ServiceContract::<Greeter>::builder("Greeter")
//!     .operation(&GREET, |g, (name,)| Reply::ready(format!("{}, {name}", g.greeting)))
//!     .build();
//!
//! assert_eq!(contract.info(), ContractInfo::new("Greeter").with_method(&GREET));
//! ```

mod method;
mod registry;
mod reply;

pub use method::{Arguments, Method};
pub use registry::{
    ContractBuilder, ContractInfo, Invoker, Operation, ResultBytes, ServiceContract,
    TypedOperation,
};
pub use reply::Reply;
