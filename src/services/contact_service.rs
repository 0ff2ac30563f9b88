use chrono::Utc;
use sea_orm::{ActiveModelTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit,
    dto::contact::{ContactForm, ContactMessageList},
    entity::{
        contact_messages::{
            ActiveModel as ContactActive, Column as ContactCol, Entity as ContactMessages,
        },
        users::Entity as Users,
    },
    error::{AppError, AppResult, FieldError},
    middleware::auth::{AuthUser, ensure_admin},
    models::ContactMessage,
    response::{ApiResponse, Meta},
    routes::params::{ContactListQuery, non_blank},
    services::paging::{contains_ci, like_pattern, paginate},
    state::AppState,
};

pub const CONTACT_PAGE_SIZE: i64 = 20;

/// Empty form for anonymous visitors, pre-filled from the profile otherwise.
pub async fn contact_form(
    state: &AppState,
    user: Option<&AuthUser>,
) -> AppResult<ApiResponse<ContactForm>> {
    let profile = match user {
        Some(user) => Users::find_by_id(user.user_id).one(&state.orm).await?,
        None => None,
    };
    let mut form = ContactForm::default();
    if let Some(profile) = profile {
        form.name = profile.full_name();
        form.email = profile.email;
        form.phone = profile.phone;
    }
    Ok(ApiResponse::success("Contact form", form, Some(Meta::empty())))
}

pub async fn submit_contact(
    state: &AppState,
    user: Option<&AuthUser>,
    form: ContactForm,
) -> AppResult<Uuid> {
    let form = validate_contact(form)?;
    let id = Uuid::new_v4();

    ContactActive {
        id: Set(id),
        user_id: Set(user.map(|u| u.user_id)),
        name: Set(form.name),
        email: Set(form.email.clone()),
        phone: Set(form.phone),
        subject: Set(form.subject.clone()),
        message: Set(form.message),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(
        message_id = %id,
        email = %form.email,
        subject = %form.subject,
        "contact message received"
    );
    audit::record(
        &state.orm,
        user.map(|u| u.user_id),
        "contact_submit",
        Some("contact_messages"),
        Some(serde_json::json!({ "message_id": id })),
    )
    .await;

    Ok(id)
}

/// Trims every field and checks the form; all problems are reported together.
pub fn validate_contact(form: ContactForm) -> AppResult<ContactForm> {
    let form = ContactForm {
        name: form.name.trim().to_string(),
        email: form.email.trim().to_string(),
        phone: form
            .phone
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty()),
        subject: form.subject.trim().to_string(),
        message: form.message.trim().to_string(),
    };

    let mut errors = Vec::new();
    let len = |s: &str| s.chars().count();

    if form.name.is_empty() {
        errors.push(FieldError::new("name", "Name is required"));
    } else if len(&form.name) > 100 {
        errors.push(FieldError::new("name", "Name must be at most 100 characters"));
    }

    if form.email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if len(&form.email) > 255 {
        errors.push(FieldError::new("email", "Email must be at most 255 characters"));
    } else if !looks_like_email(&form.email) {
        errors.push(FieldError::new("email", "Email address is not valid"));
    }

    if form.phone.as_deref().is_some_and(|p| len(p) > 20) {
        errors.push(FieldError::new("phone", "Phone must be at most 20 characters"));
    }

    if form.subject.is_empty() {
        errors.push(FieldError::new("subject", "Subject is required"));
    } else if len(&form.subject) > 255 {
        errors.push(FieldError::new("subject", "Subject must be at most 255 characters"));
    }

    if form.message.is_empty() {
        errors.push(FieldError::new("message", "Message is required"));
    } else if !(10..=5000).contains(&len(&form.message)) {
        errors.push(FieldError::new(
            "message",
            "Message must be between 10 and 5000 characters",
        ));
    }

    if errors.is_empty() {
        Ok(form)
    } else {
        Err(AppError::Validation(errors))
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.contains(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}

pub async fn list_contact_messages(
    state: &AppState,
    user: &AuthUser,
    query: ContactListQuery,
) -> AppResult<ApiResponse<ContactMessageList>> {
    ensure_admin(user)?;

    let mut condition = Condition::all();
    if let Some(search) = non_blank(query.search.as_ref()) {
        let pattern = like_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(contains_ci::<ContactMessages>(ContactCol::Name, &pattern))
                .add(contains_ci::<ContactMessages>(ContactCol::Email, &pattern))
                .add(contains_ci::<ContactMessages>(ContactCol::Subject, &pattern)),
        );
    }

    let finder = ContactMessages::find()
        .filter(condition)
        .order_by_desc(ContactCol::CreatedAt)
        .order_by_desc(ContactCol::Id);
    let (rows, meta) =
        paginate(finder, &state.orm, &query.pagination(), CONTACT_PAGE_SIZE).await?;

    let items = rows.into_iter().map(ContactMessage::from).collect();
    Ok(ApiResponse::success(
        "Contact messages",
        ContactMessageList { items },
        Some(meta),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> ContactForm {
        ContactForm {
            name: " Lan Pham ".into(),
            email: "lan@example.com".into(),
            phone: Some("  ".into()),
            subject: "Sizing".into(),
            message: "Does the linen shirt run small?".into(),
        }
    }

    #[test]
    fn trims_and_accepts_valid_form() {
        let form = validate_contact(form()).expect("valid");
        assert_eq!(form.name, "Lan Pham");
        assert_eq!(form.phone, None);
    }

    #[test]
    fn collects_all_field_errors() {
        let bad = ContactForm {
            name: String::new(),
            email: "not-an-email".into(),
            phone: Some("0".repeat(21)),
            subject: String::new(),
            message: "short".into(),
        };
        let Err(AppError::Validation(errors)) = validate_contact(bad) else {
            panic!("expected validation errors");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["name", "email", "phone", "subject", "message"]);
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("a@b.co"));
        assert!(!looks_like_email("a@b"));
        assert!(!looks_like_email("@b.co"));
        assert!(!looks_like_email("a b@c.de"));
    }
}
