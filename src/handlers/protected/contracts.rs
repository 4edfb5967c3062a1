use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::database::models::{Contract, ContractForm};
use crate::middleware::{
    optional_id, parse_id, required, required_id, ApiResponse, ApiResult, CurrentUser, JsonBody, UserPrincipal,
};
use crate::services::contracts::{ContractView, ContractWithSigners};
use crate::services::ContractService;
use crate::state::SharedState;
use crate::types::{PageQuery, Paged};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuery {
    pub project_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub project_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractRef {
    pub contract_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameRequest {
    pub contract_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRequest {
    pub contract_id: Option<String>,
    #[serde(default)]
    pub form_data: Value,
}

/// GET|POST /contract/create?projectId=&name=
pub async fn create(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<CreateQuery>,
) -> ApiResult<Contract> {
    let project_id = required_id(&query.project_id, "projectId", "Please provide projectId")?;
    let contract = ContractService::new(&state)
        .create_contract(user.id, project_id, query.name.as_deref())
        .await?;
    Ok(ApiResponse::success(contract).message("contract created successfully"))
}

/// GET|POST /contract/all?projectId=&page=&limit=
pub async fn list(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Query(query): Query<ListQuery>,
) -> ApiResult<Paged<ContractWithSigners>> {
    let project_id = optional_id(&query.project_id, "projectId")?;
    let page = PageQuery { page: query.page, limit: query.limit };
    let contracts = ContractService::new(&state).list(user.id, project_id, &page).await?;
    Ok(ApiResponse::success(contracts).message("Contracts listed"))
}

/// GET /contract/:id
pub async fn get(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    Path(id): Path<String>,
) -> ApiResult<Contract> {
    let id = parse_id(&id, "contractId")?;
    let contract = ContractService::new(&state).get_owned(user.id, id).await?;
    Ok(ApiResponse::success(contract).message("contract fetched successfully"))
}

/// POST /contract/update-name
pub async fn update_name(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<RenameRequest>,
) -> ApiResult<Contract> {
    let contract_id = required_id(&body.contract_id, "contractId", "Please provide contractId")?;
    let name = required(&body.name, "name", "Please provide name")?;
    let contract = ContractService::new(&state)
        .update_contract_name(user.id, contract_id, name)
        .await?;
    Ok(ApiResponse::success(contract).message("Contract name updated successfully"))
}

/// POST /contract/render-form - Upsert the form data for a contract
pub async fn render_form(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<FormRequest>,
) -> ApiResult<ContractForm> {
    let contract_id = required_id(&body.contract_id, "contractId", "Please provide contractId")?;
    let form = ContractService::new(&state)
        .save_form(user.id, contract_id, body.form_data)
        .await?;
    Ok(ApiResponse::success(form).message("Contract form saved successfully"))
}

/// POST /contract/discord-contract - Soft delete
pub async fn discard(
    State(state): State<SharedState>,
    UserPrincipal(user): UserPrincipal,
    JsonBody(body): JsonBody<ContractRef>,
) -> ApiResult<Contract> {
    let contract_id = required_id(&body.contract_id, "contractId", "Please provide contractId")?;
    let contract = ContractService::new(&state).remove(user.id, contract_id).await?;
    Ok(ApiResponse::success(contract).message("Contract has been removed successfully"))
}

/// GET /contract/view/:contractId - Owner, invited user or signer session
pub async fn view(
    State(state): State<SharedState>,
    current: CurrentUser,
    Path(contract_id): Path<String>,
) -> ApiResult<ContractView> {
    let contract_id = parse_id(&contract_id, "contractId")?;
    let view = ContractService::new(&state).view(&current, contract_id).await?;
    Ok(ApiResponse::success(view).message("View contract fetched successfully"))
}
