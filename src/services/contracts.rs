use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::database::models::{Contract, ContractFields, ContractForm, DocumentStatus, Signer};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::middleware::CurrentUser;
use crate::services::media::{MediaService, MediaView};
use crate::services::projects::ProjectService;
use crate::state::AppState;
use crate::types::{PageQuery, Paged, ACTIVE, REMOVED};

pub const DEFAULT_CONTRACT_NAME: &str = "Untitled contract";

#[derive(Debug, Serialize)]
pub struct ContractWithSigners {
    #[serde(flatten)]
    pub contract: Contract,
    pub signers: Vec<Value>,
}

/// Everything a participant needs to render a contract
#[derive(Debug, Serialize)]
pub struct ContractView {
    pub contract: Contract,
    pub files: Vec<MediaView>,
    pub form: Option<ContractForm>,
    pub fields: Vec<ContractFields>,
    pub signers: Vec<Value>,
}

pub struct ContractService {
    contracts: Repository<Contract>,
    forms: Repository<ContractForm>,
    fields: Repository<ContractFields>,
    signers: Repository<Signer>,
    projects: ProjectService,
    media: MediaService,
}

impl ContractService {
    pub fn new(state: &AppState) -> Self {
        Self {
            contracts: Repository::new(state.store.clone()),
            forms: Repository::new(state.store.clone()),
            fields: Repository::new(state.store.clone()),
            signers: Repository::new(state.store.clone()),
            projects: ProjectService::new(state),
            media: MediaService::new(state),
        }
    }

    pub async fn create_contract(&self, user_id: Uuid, project_id: Uuid, name: Option<&str>) -> Result<Contract, ApiError> {
        self.projects.require_project(user_id, project_id).await?;

        let contract = Contract {
            id: Uuid::new_v4(),
            name: name
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or(DEFAULT_CONTRACT_NAME)
                .to_string(),
            project_id,
            user_id,
            document_status: DocumentStatus::Draft,
            is_single_signer: false,
            status: ACTIVE,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.contracts.insert(&contract).await?;
        Ok(contract)
    }

    /// Owned contracts, newest first, each with its active signers
    pub async fn list(&self, user_id: Uuid, project_id: Option<Uuid>, query: &PageQuery) -> Result<Paged<ContractWithSigners>, ApiError> {
        let (page, limit) = query.resolve();
        let (_, offset) = query.offset();
        let mut where_clause = json!({ "userId": user_id, "status": ACTIVE });
        if let Some(project_id) = project_id {
            where_clause["projectId"] = json!(project_id);
        }

        let contracts = self
            .contracts
            .select_any(FilterData::where_(where_clause.clone()).order("createdAt desc").limit(limit, offset))
            .await?;
        let total = self.contracts.count(where_clause).await?;

        let ids: Vec<Uuid> = contracts.iter().map(|c| c.id).collect();
        let signers = if ids.is_empty() {
            vec![]
        } else {
            self.signers
                .select_any(FilterData::where_(json!({ "contractId": { "$in": ids }, "status": ACTIVE })))
                .await?
        };

        let items = contracts
            .into_iter()
            .map(|contract| {
                let signers = signers
                    .iter()
                    .filter(|s| s.contract_id == contract.id)
                    .map(Signer::public_json)
                    .collect();
                ContractWithSigners { contract, signers }
            })
            .collect();

        Ok(Paged { items, total, page, limit })
    }

    /// Owner-scoped lookup; `None` for unknown or removed contracts
    pub async fn get_single_contract(&self, user_id: Uuid, id: Uuid) -> Result<Option<Contract>, ApiError> {
        self.find_one(json!({ "_id": id, "userId": user_id, "status": ACTIVE })).await
    }

    pub async fn get_owned(&self, user_id: Uuid, id: Uuid) -> Result<Contract, ApiError> {
        self.get_single_contract(user_id, id)
            .await?
            .ok_or_else(|| ApiError::not_found("Contract not found"))
    }

    pub async fn find_one(&self, where_clause: Value) -> Result<Option<Contract>, ApiError> {
        Ok(self.contracts.select_one(where_clause).await?)
    }

    /// Active contract regardless of owner
    pub async fn find_active(&self, id: Uuid) -> Result<Contract, ApiError> {
        self.find_one(json!({ "_id": id, "status": ACTIVE }))
            .await?
            .ok_or_else(|| ApiError::not_found("Contract not found"))
    }

    pub async fn find_one_and_update(&self, where_clause: Value, patch: Value) -> Result<Contract, ApiError> {
        Ok(self.contracts.update_404(where_clause, patch, "Contract").await?)
    }

    pub async fn update_contract_name(&self, user_id: Uuid, id: Uuid, name: &str) -> Result<Contract, ApiError> {
        self.find_one_and_update(
            json!({ "_id": id, "userId": user_id, "status": ACTIVE }),
            json!({ "name": name.trim() }),
        )
        .await
    }

    pub async fn set_document_status(&self, id: Uuid, status: DocumentStatus) -> Result<Contract, ApiError> {
        self.find_one_and_update(json!({ "_id": id }), json!({ "documentStatus": status })).await
    }

    pub async fn remove(&self, user_id: Uuid, id: Uuid) -> Result<Contract, ApiError> {
        self.find_one_and_update(
            json!({ "_id": id, "userId": user_id, "status": ACTIVE }),
            json!({ "status": REMOVED }),
        )
        .await
    }

    /// One form per contract; later saves replace the data
    pub async fn save_form(&self, user_id: Uuid, contract_id: Uuid, form_data: Value) -> Result<ContractForm, ApiError> {
        self.get_owned(user_id, contract_id).await?;

        if let Some(form) = self
            .forms
            .update_one(json!({ "contractId": contract_id }), json!({ "formData": form_data }))
            .await?
        {
            return Ok(form);
        }

        let form = ContractForm {
            id: Uuid::new_v4(),
            contract_id,
            user_id,
            form_data,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.forms.insert(&form).await?;
        Ok(form)
    }

    /// One field layout per contract file (or per contract when no file is named)
    pub async fn save_fields(&self, user_id: Uuid, contract_id: Uuid, file_id: Option<Uuid>, fields: Vec<Value>) -> Result<ContractFields, ApiError> {
        self.get_owned(user_id, contract_id).await?;
        if let Some(file_id) = file_id {
            match self.media.get_file(file_id).await? {
                Some(file) if file.contract_id == Some(contract_id) => {}
                _ => return Err(ApiError::not_found("File not found")),
            }
        }

        let existing = json!({ "contractId": contract_id, "fileId": file_id });
        if let Some(layout) = self.fields.update_one(existing, json!({ "fields": fields })).await? {
            return Ok(layout);
        }

        let layout = ContractFields {
            id: Uuid::new_v4(),
            contract_id,
            file_id,
            user_id,
            fields,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.fields.insert(&layout).await?;
        Ok(layout)
    }

    pub async fn list_fields(&self, contract_id: Uuid) -> Result<Vec<ContractFields>, ApiError> {
        Ok(self
            .fields
            .select_any(FilterData::where_(json!({ "contractId": contract_id })))
            .await?)
    }

    /// Owner, a signer session for this contract, or a user invited as one of its signers
    pub async fn check_view_access(&self, caller: &CurrentUser, contract: &Contract) -> Result<(), ApiError> {
        if caller.is_signer() {
            return match caller.contract_id {
                Some(id) if id == contract.id => Ok(()),
                _ => Err(ApiError::forbidden("You do not have access to this contract")),
            };
        }
        if contract.user_id == caller.id {
            return Ok(());
        }
        let invited = self
            .signers
            .count(json!({ "contractId": contract.id, "email": caller.email, "status": ACTIVE }))
            .await?;
        if invited > 0 {
            Ok(())
        } else {
            Err(ApiError::forbidden("You do not have access to this contract"))
        }
    }

    pub async fn view(&self, caller: &CurrentUser, contract_id: Uuid) -> Result<ContractView, ApiError> {
        let contract = self.find_active(contract_id).await?;
        self.check_view_access(caller, &contract).await?;

        let files = self.media.contract_files(contract.id).await?;
        let form = self.forms.select_one(json!({ "contractId": contract.id })).await?;
        let fields = self.list_fields(contract.id).await?;
        let signers = self
            .signers
            .select_any(FilterData::where_(json!({ "contractId": contract.id, "status": ACTIVE })))
            .await?
            .iter()
            .map(Signer::public_json)
            .collect();

        Ok(ContractView {
            contract,
            files: self.media.with_urls(files).await,
            form,
            fields,
            signers,
        })
    }
}
