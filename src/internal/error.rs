use thiserror::Error;
use std::io;

/// Unified error type for the recordkit library.
#[derive(Error, Debug)]
pub enum Error {
    /// A default value could not be deep-copied while deriving a schema.
    #[error("Descriptor Clone Failure: field '{field}' of schema '{schema}' has a default that cannot be deep-copied")]
    DescriptorCloneFailure { schema: String, field: String },

    /// A descriptor can never be instantiated (definition-time error).
    #[error("Invalid Descriptor: field '{field}' of schema '{schema}': {reason}")]
    InvalidDescriptor {
        schema: String,
        field: String,
        reason: String,
    },

    /// The number of bytes a field needs cannot be determined from the remaining input.
    #[error("Parse Length Indeterminate: cannot determine the length of field '{field}'")]
    ParseLengthIndeterminate { field: String },

    /// A field needs more bytes than the input still holds.
    #[error("Parse Underflow: field '{field}' needs {needed} bytes, {available} available")]
    ParseUnderflow {
        field: String,
        needed: usize,
        available: usize,
    },

    /// Nested sections exceed the configured parse depth.
    #[error("Nesting Too Deep: maximum depth of {0} exceeded")]
    NestingTooDeep(usize),

    /// Error related to encoding/decoding a single value.
    #[error("Codec Error: {0}")]
    CodecError(String),

    /// Error related to schema definition.
    #[error("Schema Error: {0}")]
    SchemaError(String),

    /// Error related to the schema registry.
    #[error("Registry Error: {0}")]
    RegistryError(String),

    /// A bound value could not be resolved.
    #[error("Binding Error: {0}")]
    BindingError(String),

    /// An action could not be created or initialized.
    #[error("Action Error: {0}")]
    ActionError(String),

    /// A field name or path does not exist in the record.
    #[error("Unknown Field: {0}")]
    UnknownField(String),

    /// A value does not fit the field type it is written to.
    #[error("Value Out Of Range: {value} does not fit {type_name}")]
    ValueOutOfRange { type_name: String, value: String },
}

impl Error {
    /// Returns true for parse errors that abort a record even when the field is optional.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::ParseUnderflow { .. } | Error::NestingTooDeep(_))
    }
}

/// A specialized `Result` type for recordkit operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        // byteorder readers report short input as io errors
        Error::CodecError(format!("IO Error during codec operation: {}", err))
    }
}
