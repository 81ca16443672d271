pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Feature {feature} is not enabled.")]
	FeatureDisabled { feature: String },
	#[error("Unauthenticated: {message}")]
	Unauthenticated { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<trove_storage::Error> for Error {
	fn from(err: trove_storage::Error) -> Self {
		match err {
			trove_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			trove_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			trove_storage::Error::Decode(message) => Self::Storage { message },
		}
	}
}
