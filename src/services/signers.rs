use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{generate_jwt, validate_jwt, Claims, TokenKind};
use crate::config;
use crate::database::models::{
    Contract, DocumentStatus, EmailData, NotificationType, Signature, Signer, SignerAction, SigningStatus, User,
};
use crate::database::Repository;
use crate::error::ApiError;
use crate::filter::FilterData;
use crate::mail::{templates, Mailer};
use crate::middleware::CurrentUser;
use crate::services::contracts::ContractService;
use crate::services::notifications::NotificationService;
use crate::services::users::normalize_email;
use crate::state::AppState;
use crate::storage::{decode_data_url, extension_for, MediaStorage};
use crate::types::{ACTIVE, REMOVED};

pub const DEFAULT_SIGNING_MESSAGE: &str = "Please sign the document";
const SELF_SIGNER_MESSAGE: &str = "You can't add yourself as a signer";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MemberInput {
    pub name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub action: Option<SignerAction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoveInput {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedSignature {
    pub pub_key_fingerprint: Option<String>,
    pub styling: Option<Value>,
    pub signature_text: Option<String>,
    pub signature_id: Option<String>,
}

/// Signature with a URL for drawn images
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureView {
    #[serde(flatten)]
    pub signature: Signature,
    pub image_url: Option<String>,
}

/// Outcome of a batch of invitation emails
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct EmailReport {
    pub sent: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerSession {
    pub token: String,
    pub user_data: Value,
}

/// `{frontend}/app/contract/view/{b64(contractId)}/sign?token={b64(token)}`
pub fn signing_link(frontend_url: &str, contract_id: Uuid, token: &str) -> String {
    format!(
        "{}/app/contract/view/{}/sign?token={}",
        frontend_url.trim_end_matches('/'),
        STANDARD.encode(contract_id.to_string()),
        STANDARD.encode(token),
    )
}

/// Accepts a raw JWT or the base64 form carried in signing links
pub fn decode_link_token(raw: &str) -> String {
    let raw = raw.trim();
    if raw.matches('.').count() == 2 {
        return raw.to_string();
    }
    STANDARD
        .decode(raw)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .filter(|decoded| decoded.matches('.').count() == 2)
        .unwrap_or_else(|| raw.to_string())
}

/// Contract id as a UUID or in the base64 form used in signing links
pub fn decode_link_contract_id(raw: &str) -> Option<Uuid> {
    let raw = raw.trim();
    Uuid::parse_str(raw).ok().or_else(|| {
        STANDARD
            .decode(raw)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|decoded| Uuid::parse_str(decoded.trim()).ok())
    })
}

/// Validated new member: trimmed name, normalised email
#[derive(Debug, Clone, PartialEq)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    pub action: SignerAction,
}

/// Checks a batch of additions before anything is written.
///
/// `existing` holds the emails already on the team after removals; `team`
/// names it in the duplicate message (`<name> already added to the <team>`).
pub fn validate_additions(
    caller_email: &str,
    additions: &[MemberInput],
    existing: &HashSet<String>,
    team: &str,
    self_message: &str,
) -> Result<Vec<NewMember>, ApiError> {
    let caller_email = normalize_email(caller_email);
    let mut seen: HashSet<String> = existing.clone();
    let mut members = Vec::with_capacity(additions.len());

    for addition in additions {
        let email = addition
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::field("addMembers", "Please provide an email for every member"))?;
        let name = addition
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(email.as_str())
            .to_string();

        if email == caller_email {
            return Err(ApiError::field("addMembers", self_message));
        }
        if !seen.insert(email.clone()) {
            return Err(ApiError::field("addMembers", format!("{} already added to the {}", name, team)));
        }
        members.push(NewMember {
            name,
            email,
            action: addition.action.unwrap_or_default(),
        });
    }
    Ok(members)
}

pub fn removal_emails(removals: &[RemoveInput]) -> Vec<String> {
    removals
        .iter()
        .filter_map(|r| r.email.as_deref().map(normalize_email))
        .filter(|e| !e.is_empty())
        .collect()
}

pub struct SignerService {
    signers: Repository<Signer>,
    signatures: Repository<Signature>,
    contracts: ContractService,
    notifications: NotificationService,
    mailer: Arc<dyn Mailer>,
    storage: MediaStorage,
}

impl SignerService {
    pub fn new(state: &AppState) -> Self {
        Self {
            signers: Repository::new(state.store.clone()),
            signatures: Repository::new(state.store.clone()),
            contracts: ContractService::new(state),
            notifications: NotificationService::new(state),
            mailer: state.mailer.clone(),
            storage: state.storage.clone(),
        }
    }

    pub async fn active_signers(&self, contract_id: Uuid) -> Result<Vec<Signer>, ApiError> {
        Ok(self
            .signers
            .select_any(FilterData::where_(json!({ "contractId": contract_id, "status": ACTIVE })))
            .await?)
    }

    /// Adds and removes signers; every addition is validated before any write
    pub async fn invite_signers(
        &self,
        user: &User,
        contract_id: Uuid,
        additions: &[MemberInput],
        removals: &[RemoveInput],
    ) -> Result<Vec<Value>, ApiError> {
        self.contracts.get_owned(user.id, contract_id).await?;

        let removed = removal_emails(removals);
        let existing: HashSet<String> = self
            .active_signers(contract_id)
            .await?
            .into_iter()
            .map(|s| s.email)
            .filter(|email| !removed.contains(email))
            .collect();
        let members = validate_additions(&user.email, additions, &existing, "contract", SELF_SIGNER_MESSAGE)?;

        if !removed.is_empty() {
            let count = self
                .signers
                .update_many(
                    json!({ "contractId": contract_id, "email": { "$in": removed }, "status": ACTIVE }),
                    json!({ "status": REMOVED, "token": null }),
                )
                .await?;
            info!(contract = %contract_id, count, "Removed signers");
        }

        let now = Utc::now();
        let records: Vec<Signer> = members
            .into_iter()
            .map(|m| Signer {
                id: Uuid::new_v4(),
                contract_id,
                name: m.name,
                email: m.email,
                action: m.action,
                created_by: user.id,
                status: ACTIVE,
                emailsent: false,
                token: None,
                email_data: None,
                is_agreed: false,
                document_status: SigningStatus::Pending,
                signed_at: None,
                signature_id: None,
                created_at: now,
                updated_at: None,
            })
            .collect();
        self.signers.insert_many(&records).await?;

        Ok(self.active_signers(contract_id).await?.iter().map(Signer::public_json).collect())
    }

    pub async fn members(&self, user_id: Uuid, contract_id: Uuid) -> Result<Vec<Value>, ApiError> {
        self.contracts.get_owned(user_id, contract_id).await?;
        Ok(self.active_signers(contract_id).await?.iter().map(Signer::public_json).collect())
    }

    pub async fn set_single_signer(&self, user_id: Uuid, contract_id: Uuid, enabled: bool) -> Result<Contract, ApiError> {
        self.contracts
            .find_one_and_update(
                json!({ "_id": contract_id, "userId": user_id, "status": ACTIVE }),
                json!({ "isSingleSigner": enabled }),
            )
            .await
    }

    pub async fn list_signatures(&self, owner: Uuid) -> Result<Vec<SignatureView>, ApiError> {
        let signatures = self
            .signatures
            .select_any(FilterData::where_(json!({ "userId": owner, "status": ACTIVE })).order("createdAt desc"))
            .await?;
        let mut views = Vec::with_capacity(signatures.len());
        for signature in signatures {
            views.push(self.signature_view(signature).await);
        }
        Ok(views)
    }

    async fn signature_view(&self, signature: Signature) -> SignatureView {
        let image_url = match &signature.image_key {
            Some(key) => Some(self.storage.url(key).await),
            None => None,
        };
        SignatureView { signature, image_url }
    }

    async fn owned_signature(&self, owner: Uuid, id: Uuid) -> Result<Signature, ApiError> {
        Ok(self
            .signatures
            .select_404(json!({ "_id": id, "userId": owner, "status": ACTIVE }), "Signature")
            .await?)
    }

    /// Creates a typed signature, or replaces `signature_id` with one
    pub async fn add_typed_signature(&self, owner: Uuid, signature_id: Option<Uuid>, input: TypedSignature) -> Result<SignatureView, ApiError> {
        let signature_text = input
            .signature_text
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::field("signatureText", "Please provide signatureText"))?
            .to_string();

        let signature = match signature_id {
            Some(id) => {
                let existing = self.owned_signature(owner, id).await?;
                if let Some(key) = &existing.image_key {
                    self.storage.delete_quietly(key).await;
                }
                self.signatures
                    .update_404(
                        json!({ "_id": existing.id }),
                        json!({
                            "pubKeyFingerprint": input.pub_key_fingerprint,
                            "styling": input.styling,
                            "signatureText": signature_text,
                            "imageKey": null,
                        }),
                        "Signature",
                    )
                    .await?
            }
            None => {
                let signature = Signature {
                    id: Uuid::new_v4(),
                    user_id: owner,
                    pub_key_fingerprint: input.pub_key_fingerprint,
                    styling: input.styling,
                    signature_text: Some(signature_text),
                    image_key: None,
                    status: ACTIVE,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                self.signatures.insert(&signature).await?;
                signature
            }
        };
        Ok(self.signature_view(signature).await)
    }

    /// Stores a drawn signature image (data URL or bare base64)
    pub async fn add_drawn_signature(&self, owner: Uuid, signature_id: Option<Uuid>, image: &str) -> Result<SignatureView, ApiError> {
        let decoded = decode_data_url(image)?;
        let existing = match signature_id {
            Some(id) => Some(self.owned_signature(owner, id).await?),
            None => None,
        };

        let file_name = format!("signature.{}", extension_for(&decoded.mime_type));
        let key = MediaStorage::object_key("signatures", owner, &file_name);
        self.storage.put(&key, decoded.bytes).await?;

        let signature = match existing {
            Some(existing) => {
                if let Some(old) = &existing.image_key {
                    self.storage.delete_quietly(old).await;
                }
                self.signatures
                    .update_404(
                        json!({ "_id": existing.id }),
                        json!({
                            "imageKey": key,
                            "pubKeyFingerprint": null,
                            "styling": null,
                            "signatureText": null,
                        }),
                        "Signature",
                    )
                    .await?
            }
            None => {
                let signature = Signature {
                    id: Uuid::new_v4(),
                    user_id: owner,
                    pub_key_fingerprint: None,
                    styling: None,
                    signature_text: None,
                    image_key: Some(key),
                    status: ACTIVE,
                    created_at: Utc::now(),
                    updated_at: None,
                };
                self.signatures.insert(&signature).await?;
                signature
            }
        };
        Ok(self.signature_view(signature).await)
    }

    /// Emails every active signer not yet invited; the contract leaves draft once one mail is out
    pub async fn send_invitations(
        &self,
        user: &User,
        contract_id: Uuid,
        subject: &str,
        message: Option<&str>,
        expiry_days: Option<i64>,
    ) -> Result<EmailReport, ApiError> {
        let contract = self.contracts.get_owned(user.id, contract_id).await?;
        let days = expiry_days.unwrap_or(config::config().security.invite_expiry_days as i64);
        if days < 1 {
            return Err(ApiError::field("expiry", "expiry must be at least one day"));
        }
        let message = message.map(str::trim).filter(|m| !m.is_empty()).unwrap_or(DEFAULT_SIGNING_MESSAGE);
        let frontend_url = &config::config().server.frontend_url;
        let sender_name = format!("{} {}", user.first_name, user.last_name);

        let mut report = EmailReport::default();
        for signer in self.active_signers(contract.id).await? {
            if signer.emailsent {
                continue;
            }

            let token = generate_jwt(&Claims::invite(signer.id, &signer.email, contract.id, days))?;
            let link = signing_link(frontend_url, contract.id, &token);
            let mail = templates::contract_invitation(&signer.email, &signer.name, sender_name.trim(), subject, Some(message), &link, days);

            if let Err(e) = self.mailer.send(mail).await {
                warn!(signer = %signer.id, error = %e, "Failed to send signing invitation");
                report.failed.push(signer.email);
                continue;
            }

            let now = Utc::now();
            let email_data = EmailData {
                subject: subject.to_string(),
                message: Some(message.to_string()),
                expires_at: Some(now + Duration::days(days)),
                sent_at: now,
            };
            self.signers
                .update_one(
                    json!({ "_id": signer.id }),
                    json!({ "emailsent": true, "token": token, "emailData": email_data }),
                )
                .await?;
            report.sent.push(signer.email);
        }

        if !report.sent.is_empty() && contract.document_status == DocumentStatus::Draft {
            self.contracts.set_document_status(contract.id, DocumentStatus::Sent).await?;
        }
        info!(contract = %contract.id, sent = report.sent.len(), failed = report.failed.len(), "Signing invitations processed");
        Ok(report)
    }

    /// Exchanges a single-use invitation token for a signer session
    pub async fn verify(&self, raw_token: &str, contract_id: Uuid) -> Result<SignerSession, ApiError> {
        let contract = self.contracts.find_active(contract_id).await?;
        let token = decode_link_token(raw_token);
        let claims = validate_jwt(&token)?;
        if claims.kind != TokenKind::Invite || claims.contract_id != Some(contract.id) {
            return Err(ApiError::unauthorized("Invalid token"));
        }

        let signer = self
            .signers
            .select_one(json!({
                "_id": claims.sub,
                "contractId": contract.id,
                "status": ACTIVE,
                "emailsent": true,
                "token": token,
            }))
            .await?
            .ok_or_else(|| ApiError::unauthorized("This invitation link is no longer valid"))?;

        let session = generate_jwt(&Claims::signer(signer.id, &signer.email, contract.id))?;
        let signer = self
            .signers
            .update_404(json!({ "_id": signer.id }), json!({ "token": null }), "Signer")
            .await?;
        info!(signer = %signer.id, contract = %contract.id, "Signer verified");

        Ok(SignerSession {
            token: session,
            user_data: signer.public_json(),
        })
    }

    /// The caller's own signer record on a contract
    async fn locate_signer(&self, caller: &CurrentUser, contract: &Contract) -> Result<Signer, ApiError> {
        let where_clause = if caller.is_signer() {
            if caller.contract_id != Some(contract.id) {
                return Err(ApiError::forbidden("You do not have access to this contract"));
            }
            json!({ "_id": caller.id, "contractId": contract.id, "status": ACTIVE })
        } else {
            json!({ "email": normalize_email(&caller.email), "contractId": contract.id, "status": ACTIVE })
        };
        self.signers
            .select_one(where_clause)
            .await?
            .ok_or_else(|| ApiError::not_found("Signer does not exist in this contract"))
    }

    pub async fn submit(&self, caller: &CurrentUser, contract_id: Uuid, signature_id: Option<Uuid>) -> Result<Value, ApiError> {
        let contract = self.contracts.find_active(contract_id).await?;
        let signer = self.locate_signer(caller, &contract).await?;

        if !signer.emailsent {
            return Err(ApiError::bad_request("Signer has not been invited yet"));
        }
        match signer.document_status {
            SigningStatus::Declined => return Err(ApiError::conflict("Signer has already declined this contract")),
            SigningStatus::Signed => return Ok(signer.public_json()),
            SigningStatus::Pending => {}
        }
        if let Some(id) = signature_id {
            self.owned_signature(caller.id, id).await?;
        }

        let signer = self
            .signers
            .update_404(
                json!({ "_id": signer.id }),
                json!({
                    "documentStatus": SigningStatus::Signed,
                    "signedAt": crate::types::now_json(),
                    "signatureId": signature_id,
                }),
                "Signer",
            )
            .await?;

        let outstanding = self
            .active_signers(contract.id)
            .await?
            .iter()
            .filter(|s| s.action != SignerAction::View && s.document_status != SigningStatus::Signed)
            .count();
        if outstanding == 0 {
            self.contracts.set_document_status(contract.id, DocumentStatus::Completed).await?;
            self.notifications
                .notify_quietly(
                    contract.user_id,
                    NotificationType::Contract,
                    format!("All signers have signed {}", contract.name),
                    Some(format!("/app/contract/view/{}", contract.id)),
                )
                .await;
            info!(contract = %contract.id, "Contract completed");
        }
        Ok(signer.public_json())
    }

    pub async fn agree(&self, caller: &CurrentUser, contract_id: Uuid, agree: bool) -> Result<Value, ApiError> {
        let contract = self.contracts.find_active(contract_id).await?;
        let signer = self.locate_signer(caller, &contract).await?;
        let signer = self
            .signers
            .update_404(json!({ "_id": signer.id }), json!({ "isAgreed": agree }), "Signer")
            .await?;
        Ok(signer.public_json())
    }

    pub async fn decline(&self, caller: &CurrentUser, contract_id: Uuid) -> Result<Value, ApiError> {
        let contract = self.contracts.find_active(contract_id).await?;
        let signer = self.locate_signer(caller, &contract).await?;
        if signer.document_status == SigningStatus::Signed {
            return Err(ApiError::conflict("Signer has already signed this contract"));
        }

        let signer = self
            .signers
            .update_404(
                json!({ "_id": signer.id }),
                json!({ "documentStatus": SigningStatus::Declined, "isAgreed": false }),
                "Signer",
            )
            .await?;
        self.contracts.set_document_status(contract.id, DocumentStatus::Declined).await?;
        self.notifications
            .notify_quietly(
                contract.user_id,
                NotificationType::Contract,
                format!("{} declined to sign {}", signer.name, contract.name),
                Some(format!("/app/contract/view/{}", contract.id)),
            )
            .await;
        Ok(signer.public_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, email: &str) -> MemberInput {
        MemberInput { name: Some(name.into()), email: Some(email.into()), action: None }
    }

    #[test]
    fn signing_links_encode_contract_and_token() {
        let id = Uuid::parse_str("7f0c1f52-8f59-4c53-9bde-6f0b0c1e9a10").unwrap();
        let link = signing_link("https://app.cinea.io/", id, "a.b.c");
        assert_eq!(
            link,
            format!("https://app.cinea.io/app/contract/view/{}/sign?token={}", STANDARD.encode(id.to_string()), STANDARD.encode("a.b.c"))
        );
        assert_eq!(decode_link_contract_id(&STANDARD.encode(id.to_string())), Some(id));
        assert_eq!(decode_link_contract_id(&id.to_string()), Some(id));
    }

    #[test]
    fn link_tokens_decode_from_either_form() {
        assert_eq!(decode_link_token("aaa.bbb.ccc"), "aaa.bbb.ccc");
        assert_eq!(decode_link_token(&STANDARD.encode("aaa.bbb.ccc")), "aaa.bbb.ccc");
        assert_eq!(decode_link_token("garbage"), "garbage");
    }

    #[test]
    fn additions_reject_self_and_duplicates() {
        let existing: HashSet<String> = ["kim@set.io".to_string()].into_iter().collect();

        let err = validate_additions("Owner@Set.io", &[member("Me", "owner@set.io")], &existing, "contract", SELF_SIGNER_MESSAGE).unwrap_err();
        assert_eq!(err.message(), "You can't add yourself as a signer");

        let err = validate_additions("owner@set.io", &[member("Kim", "KIM@set.io")], &existing, "contract", SELF_SIGNER_MESSAGE).unwrap_err();
        assert_eq!(err.message(), "Kim already added to the contract");

        let err = validate_additions("owner@set.io", &[member("Ana", "ana@set.io"), member("Ana B", "ana@set.io")], &existing, "contract", SELF_SIGNER_MESSAGE)
            .unwrap_err();
        assert_eq!(err.message(), "Ana B already added to the contract");

        let ok = validate_additions("owner@set.io", &[member(" Lee ", "LEE@set.io")], &existing, "contract", SELF_SIGNER_MESSAGE).unwrap();
        assert_eq!(ok, vec![NewMember { name: "Lee".into(), email: "lee@set.io".into(), action: SignerAction::Sign }]);
    }
}
