use crate::{
    providers::warehouse::{json_cell_to_string, validate_table_name, Warehouse, WarehouseError},
    types::ExtractedTable,
};
use async_trait::async_trait;
use gcp_bigquery_client::{
    model::{
        get_query_results_parameters::GetQueryResultsParameters,
        get_query_results_response::GetQueryResultsResponse,
        query_request::QueryRequest,
        query_response::{QueryResponse, ResultSet},
    },
    Client,
};
use serde_json::Value;
use std::fmt::{self, Debug};
use std::future::Future;
use tracing::{debug, info};

/// Extracts tables from Google BigQuery.
///
/// Authentication uses a service-account key file when one is configured and
/// falls back to application default credentials otherwise. Either way the
/// client obtains an identity token before the first query.
#[derive(Clone)]
pub struct BigQueryWarehouse {
    client: Client,
    project_id: String,
    dataset: String,
}

impl BigQueryWarehouse {
    /// Creates a new `BigQueryWarehouse` and authenticates.
    pub async fn new(
        project_id: String,
        dataset: String,
        key_file: Option<&str>,
    ) -> Result<Self, WarehouseError> {
        let client = match key_file {
            Some(path) => {
                info!("Authenticating to BigQuery with service account key '{path}'");
                Client::from_service_account_key_file(path).await
            }
            None => {
                info!("Authenticating to BigQuery with application default credentials");
                Client::from_application_default_credentials().await
            }
        }
        .map_err(|e| WarehouseError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            project_id,
            dataset,
        })
    }
}

impl Debug for BigQueryWarehouse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BigQueryWarehouse")
            .field("project_id", &self.project_id)
            .field("dataset", &self.dataset)
            .finish_non_exhaustive()
    }
}

/// How many times an unfinished query job is polled before giving up.
/// Each poll waits up to the server-side default of ten seconds.
const MAX_JOB_POLLS: usize = 30;

#[async_trait]
impl Warehouse for BigQueryWarehouse {
    fn name(&self) -> &str {
        "BigQuery"
    }

    async fn fetch_table(&self, table: &str) -> Result<ExtractedTable, WarehouseError> {
        validate_table_name(table)?;
        let sql_query = format!(
            "SELECT * FROM `{}.{}.{}`",
            self.project_id, self.dataset, table
        );
        info!("--> Executing BigQuery SQL: {sql_query}");

        let response = self
            .client
            .job()
            .query(
                &self.project_id,
                QueryRequest {
                    query: sql_query,
                    use_legacy_sql: false,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| WarehouseError::Query(e.to_string()))?;

        let job = response
            .job_reference
            .clone()
            .ok_or_else(|| WarehouseError::Query("Response carries no job reference".into()))?;
        let job_id = job
            .job_id
            .ok_or_else(|| WarehouseError::Query("Response carries no job id".into()))?;

        let extracted = read_all_pages(table, response, |page_token| {
            let client = self.client.clone();
            let project_id = self.project_id.clone();
            let job_id = job_id.clone();
            let location = job.location.clone();
            async move {
                let page = client
                    .job()
                    .get_query_results(
                        &project_id,
                        &job_id,
                        GetQueryResultsParameters {
                            page_token,
                            location,
                            ..Default::default()
                        },
                    )
                    .await
                    .map_err(|e| WarehouseError::Query(e.to_string()))?;
                into_query_response(page)
            }
        })
        .await?;

        info!(
            "<-- Fetched {} rows from '{table}'",
            extracted.rows.len()
        );
        Ok(extracted)
    }
}

/// Drains a query job: waits for it to complete, then follows `page_token`
/// until the last page. `fetch_page` is called with `None` to poll the job and
/// with the token of the next page otherwise.
async fn read_all_pages<F, Fut>(
    table: &str,
    first: QueryResponse,
    mut fetch_page: F,
) -> Result<ExtractedTable, WarehouseError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<QueryResponse, WarehouseError>>,
{
    let mut response = first;
    let mut polls = 0;
    let mut extracted: Option<ExtractedTable> = None;

    loop {
        if response.job_complete != Some(true) {
            if polls == MAX_JOB_POLLS {
                return Err(WarehouseError::Query(format!(
                    "Query for '{table}' did not complete after {MAX_JOB_POLLS} polls"
                )));
            }
            polls += 1;
            debug!("Query for '{table}' still running (poll {polls})");
            response = fetch_page(None).await?;
            continue;
        }

        let page_token = response.page_token.clone();
        let mut results = ResultSet::new_from_query_response(response);
        let table_rows = extracted
            .get_or_insert_with(|| ExtractedTable::new(table, results.column_names()));
        append_rows(table_rows, &mut results)?;

        match page_token {
            Some(token) if !token.is_empty() => {
                debug!(
                    "Fetched {} rows of '{table}' so far, requesting next page",
                    table_rows.rows.len()
                );
                response = fetch_page(Some(token)).await?;
            }
            _ => break,
        }
    }

    Ok(extracted.unwrap_or_else(|| ExtractedTable::new(table, Vec::new())))
}

fn append_rows(
    extracted: &mut ExtractedTable,
    results: &mut ResultSet,
) -> Result<(), WarehouseError> {
    while results.next_row() {
        let row = extracted
            .columns
            .iter()
            .map(|name| {
                results
                    .get_json_value_by_name(name)
                    .map(|cell| json_cell_to_string(cell.unwrap_or(Value::Null)))
                    .map_err(|e| {
                        WarehouseError::Query(format!(
                            "Failed to decode column '{name}' of '{}': {e}",
                            extracted.name
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        extracted.rows.push(row);
    }
    Ok(())
}

/// `getQueryResults` pages share the wire shape of a `jobs.query` response.
fn into_query_response(page: GetQueryResultsResponse) -> Result<QueryResponse, WarehouseError> {
    serde_json::to_value(page)
        .and_then(serde_json::from_value)
        .map_err(|e| WarehouseError::Query(format!("Unexpected results page: {e}")))
}
