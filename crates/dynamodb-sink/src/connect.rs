use crate::convert::ValueMode;
use aws_config::BehaviorVersion;
use std::time::Duration;

/// Default number of submissions for a request whose items come back unprocessed
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
/// Default delay before the first resubmission (doubled on every attempt)
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// DynamoDB sink options
#[derive(Clone, Debug)]
pub struct DynamoDbOpts {
    /// How cell text is mapped to attribute values
    pub value_mode: ValueMode,
    /// Total submissions per request, counting the first one
    pub max_attempts: u32,
    /// Delay before the first resubmission of unprocessed items
    pub retry_base_delay: Duration,
}

impl Default for DynamoDbOpts {
    fn default() -> Self {
        Self {
            value_mode: ValueMode::default(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        }
    }
}

/// Build a DynamoDB client from the ambient AWS configuration.
///
/// Region, credentials and endpoint overrides (`AWS_ENDPOINT_URL`,
/// `AWS_ENDPOINT_URL_DYNAMODB`) come from the environment.
pub async fn dynamodb_client() -> aws_sdk_dynamodb::Client {
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;

    tracing::debug!(
        "Creating DynamoDB client (region: {:?})",
        sdk_config.region().map(|r| r.as_ref().to_string())
    );

    aws_sdk_dynamodb::Client::new(&sdk_config)
}
