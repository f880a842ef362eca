//! Agent tool webhook DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use telebridge::{CustomerRecord, PolicySummary};

use crate::application::tools::LookupOutcome;

#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupRequest {
    pub phone_number: Option<String>,
    pub policy_number: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PolicyResponse {
    pub policy_number: String,
    pub product: String,
    pub status: String,
    pub open_claims: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerResponse {
    pub customer_id: String,
    pub full_name: String,
    pub phone_number: String,
    pub document_id: Option<String>,
    pub policies: Vec<PolicyResponse>,
}

impl CustomerResponse {
    pub fn from_domain(customer: CustomerRecord) -> Self {
        Self {
            customer_id: customer.customer_id,
            full_name: customer.full_name,
            phone_number: customer.phone_number,
            document_id: customer.document_id,
            policies: customer
                .policies
                .into_iter()
                .map(|p: PolicySummary| PolicyResponse {
                    policy_number: p.policy_number,
                    product: p.product,
                    status: p.status,
                    open_claims: p.open_claims,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LookupResponse {
    pub found: bool,
    pub customer: Option<CustomerResponse>,
    pub message: String,
}

impl LookupResponse {
    pub fn from_outcome(outcome: LookupOutcome) -> Self {
        Self {
            found: outcome.found,
            customer: outcome.customer.map(CustomerResponse::from_domain),
            message: outcome.message,
        }
    }
}

/// Context the agent saves ahead of a handoff
#[derive(Debug, Deserialize, ToSchema)]
pub struct SaveContextRequest {
    pub call_id: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub summary: String,
    pub department: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveContextResponse {
    pub success: bool,
    pub message: String,
}
