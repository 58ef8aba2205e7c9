//! redshift_billing_analyzer - daily cost lookup for a date range

use crate::billing::analyze;
use crate::error::GatewayError;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BillingAnalyzerArgs {
    /// First day of the range, inclusive (YYYY-MM-DD)
    pub start_date: String,
    /// Last day of the range, inclusive (YYYY-MM-DD)
    pub end_date: String,
}

pub fn redshift_billing_analyzer(args: &BillingAnalyzerArgs) -> Result<Value, GatewayError> {
    let entries = analyze(&args.start_date, &args.end_date)?;
    serde_json::to_value(entries).map_err(|e| GatewayError::Execution(e.to_string()))
}
