pub mod assets;
pub mod builtins;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod host;
pub mod runtime;
pub mod runtime_value;

pub use assets::{Asset, AssetStore};
pub use environment::Environment;
pub use error::{DiagnosticError, RuntimeError};
pub use executor::{execute_into, execute_program};
pub use host::{BufferHost, Host, SpriteDraw};
pub use runtime::Runtime;
pub use runtime_value::RuntimeValue;
