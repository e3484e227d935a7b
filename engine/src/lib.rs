pub mod adapter;
pub mod block;
pub mod config;
pub mod error;
mod evaluator;
pub mod interpreter;
pub mod math;
pub mod resolver;
pub mod response;
pub mod runtime;
pub mod seed;

pub use adapter::{Adapter, Channel, Guild, Member};
pub use block::{BlockRegistry, BlockSpec};
pub use config::Limits;
pub use error::{BlockError, LoadError};
pub use interpreter::Interpreter;
pub use response::{Actions, Check, Cooldown, EmbedField, EmbedSpec, Overrides, Response, Target};
pub use runtime::{BlockContext, Runtime};
pub use seed::{BUILTIN_NAMES, Seed, SeedFile};
