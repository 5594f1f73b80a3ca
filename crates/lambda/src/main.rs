// AWS Lambda binary entry point
//
// Build with: cargo build -p csv-table-loader-lambda

#![recursion_limit = "256"]

#[tokio::main]
async fn main() -> Result<(), lambda_runtime::Error> {
    csv_table_loader_lambda::run().await
}
