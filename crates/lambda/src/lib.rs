// AWS Lambda runtime adapter
//
// Configuration is read from the environment once at cold start; every
// invocation loads the configured object into the configured table.

use clap::Parser;
use csv_loader::{load, load_with_s3, Config, LoadError, S3Client};
use csv_table_loader::{connect_sink, LoadOpts};
use lambda_runtime::{service_fn, Error, LambdaEvent};
use std::sync::Arc;
use table_sink::TableSink;
use tracing_subscriber::EnvFilter;

mod response;

pub use response::LoadResponse;

pub(crate) struct LambdaState<S> {
    pub config: Config,
    pub sink: Arc<S>,
    /// Built at cold start; local sources and tests go without one
    pub s3: Option<S3Client>,
}

/// Run one load with the cold-start configuration.
pub(crate) async fn invoke<S>(state: &LambdaState<S>) -> Result<LoadResponse, LoadError>
where
    S: TableSink + 'static,
{
    let report = match &state.s3 {
        Some(s3) => load_with_s3(&state.config, state.sink.clone(), s3).await?,
        None => load(&state.config, state.sink.clone()).await?,
    };
    Ok(LoadResponse::from_report(&report))
}

/// Lambda handler. The event payload is not used.
async fn handle_request<S>(
    event: LambdaEvent<serde_json::Value>,
    state: Arc<LambdaState<S>>,
) -> Result<LoadResponse, Error>
where
    S: TableSink + 'static,
{
    let (_payload, context) = event.into_parts();
    tracing::info!("Invocation {} started", context.request_id);

    match invoke(&state).await {
        Ok(response) => Ok(response),
        Err(e) => {
            tracing::error!("Invocation {} failed: {e:#}", context.request_id);
            Err(e.into())
        }
    }
}

/// Lambda runtime entry point
pub async fn run() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        // CloudWatch adds the ingestion time and the function name
        .with_target(false)
        .without_time()
        .init();

    let opts = LoadOpts::try_parse_from([env!("CARGO_PKG_NAME")])
        .map_err(|e| Error::from(format!("Invalid configuration: {e}")))?;
    let config = opts.load_config()?;
    let sink = connect_sink(&opts).await;
    let s3 = S3Client::new().await?;

    tracing::info!(
        "Lambda configured to load {} into '{}' (batch size {})",
        config.source,
        config.table,
        config.batch_size
    );

    let state = Arc::new(LambdaState {
        config,
        sink,
        s3: Some(s3),
    });

    lambda_runtime::run(service_fn(move |event: LambdaEvent<serde_json::Value>| {
        let state = state.clone();
        async move { handle_request(event, state).await }
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::get_object::GetObjectOutput;
    use aws_sdk_s3::primitives::ByteStream;
    use aws_smithy_mocks::{mock, mock_client};
    use csv_loader::{FailurePolicy, FileSource, MemorySink, TableInfo};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_fixture(rows: usize) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(temp_file, "id,city").unwrap();
        for i in 0..rows {
            writeln!(temp_file, "{i},city-{i}").unwrap();
        }
        temp_file.flush().unwrap();
        temp_file
    }

    fn state_for(source: FileSource, sink: MemorySink) -> LambdaState<MemorySink> {
        LambdaState {
            config: Config::new(source, "cities"),
            sink: Arc::new(sink),
            s3: None,
        }
    }

    #[tokio::test]
    async fn test_invoke_reports_uploaded() {
        let file = csv_fixture(250);
        let state = state_for(
            FileSource::Local(file.path().to_path_buf()),
            MemorySink::new(TableInfo::new("cities")),
        );

        let response = invoke(&state).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(response.body, "uploaded");
        assert_eq!(state.sink.batch_sizes(), vec![100, 100, 50]);
    }

    #[tokio::test]
    async fn test_invoke_empty_source_still_uploaded() {
        let file = csv_fixture(0);
        let state = state_for(
            FileSource::Local(file.path().to_path_buf()),
            MemorySink::new(TableInfo::new("cities")),
        );

        let response = invoke(&state).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(state.sink.calls(), 0);
    }

    #[tokio::test]
    async fn test_invoke_missing_source_fails() {
        let state = state_for(
            FileSource::parse("/nonexistent/cities.csv").unwrap(),
            MemorySink::new(TableInfo::new("cities")),
        );

        let result = invoke(&state).await;

        assert!(matches!(result, Err(LoadError::SourceOpen { .. })));
    }

    #[tokio::test]
    async fn test_invoke_best_effort_partial() {
        let file = csv_fixture(250);
        let mut state = state_for(
            FileSource::Local(file.path().to_path_buf()),
            MemorySink::new(TableInfo::new("cities")).fail_batch(0),
        );
        state.config.failure_policy = FailurePolicy::BestEffort;

        let response = invoke(&state).await.unwrap();

        assert_eq!(response.status_code, 207);
        assert_eq!(response.body, "uploaded 150 rows, 100 failed");
    }

    #[tokio::test]
    async fn test_invoke_reads_s3_through_state_client() {
        let body = (0..150).fold("id,city\n".to_string(), |mut csv, i| {
            csv.push_str(&format!("{i},city-{i}\n"));
            csv
        });
        let get_object = mock!(aws_sdk_s3::Client::get_object)
            .match_requests(|req| {
                req.bucket() == Some("uploads") && req.key() == Some("cities.csv")
            })
            .then_output(move || {
                GetObjectOutput::builder()
                    .body(ByteStream::from(body.clone().into_bytes()))
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, [&get_object]);

        let mut state = state_for(
            FileSource::s3("uploads", "cities.csv").unwrap(),
            MemorySink::new(TableInfo::new("cities")),
        );
        state.s3 = Some(S3Client::from_client(client));

        let response = invoke(&state).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert_eq!(get_object.num_calls(), 1);
        assert_eq!(state.sink.batch_sizes(), vec![100, 50]);
    }

    #[tokio::test]
    async fn test_invoke_interrupted_batch_reports_written_rows() {
        let file = csv_fixture(250);
        let mut state = state_for(
            FileSource::Local(file.path().to_path_buf()),
            MemorySink::new(TableInfo::new("cities")).fail_batch_after(0, 75),
        );
        state.config.failure_policy = FailurePolicy::BestEffort;

        let response = invoke(&state).await.unwrap();

        assert_eq!(response.status_code, 207);
        assert_eq!(response.body, "uploaded 225 rows, 25 failed");
    }
}
