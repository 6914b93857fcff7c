//! Проверка полей папок и серверов. Используется и сервером (422),
//! и клиентом (запрос не отправляется).

use crate::models::{
    CreateFolderRequest, CreateServerRequest, FolderExport, ServerExport, UpdateFolderRequest,
    UpdateServerRequest, NO_PAYMENT_DATE,
};
use crate::ordering::due_day;
use thiserror::Error;

pub const MAX_NAME_LEN: usize = 100;
pub const MAX_IP_LEN: usize = 45;
pub const MAX_PROVIDER_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

pub fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, "не может быть пустым"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            field,
            format!("не длиннее {MAX_NAME_LEN} символов"),
        ));
    }
    Ok(())
}

/// Цвет папки в формате `#rrggbb`.
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].bytes().all(|b| b.is_ascii_hexdigit());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("color", "ожидается цвет вида #rrggbb"))
    }
}

pub fn validate_ip(ip: &str) -> Result<(), ValidationError> {
    if ip.trim().is_empty() {
        return Err(ValidationError::new("ip", "не может быть пустым"));
    }
    if ip.len() > MAX_IP_LEN {
        return Err(ValidationError::new(
            "ip",
            format!("не длиннее {MAX_IP_LEN} символов"),
        ));
    }
    Ok(())
}

pub fn validate_provider(provider: &str) -> Result<(), ValidationError> {
    if provider.chars().count() > MAX_PROVIDER_LEN {
        return Err(ValidationError::new(
            "provider",
            format!("не длиннее {MAX_PROVIDER_LEN} символов"),
        ));
    }
    Ok(())
}

pub fn validate_price(price: f64) -> Result<(), ValidationError> {
    if !price.is_finite() || price < 0.0 {
        return Err(ValidationError::new("price", "должна быть неотрицательным числом"));
    }
    Ok(())
}

/// Трёхбуквенный код валюты (ISO 4217).
pub fn validate_currency(currency: &str) -> Result<(), ValidationError> {
    let code = currency.trim();
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ValidationError::new("currency", "ожидается трёхбуквенный код"))
    }
}

/// "-" или день месяца 1..31.
pub fn validate_payment_date(payment_date: &str) -> Result<(), ValidationError> {
    if payment_date.trim() == NO_PAYMENT_DATE || due_day(payment_date).is_some() {
        Ok(())
    } else {
        Err(ValidationError::new(
            "payment_date",
            "ожидается \"-\" или день месяца от 1 до 31",
        ))
    }
}

pub fn validate_create_folder(req: &CreateFolderRequest) -> Result<(), ValidationError> {
    validate_name("name", &req.name)?;
    validate_color(&req.color)
}

pub fn validate_update_folder(req: &UpdateFolderRequest) -> Result<(), ValidationError> {
    if let Some(name) = &req.name {
        validate_name("name", name)?;
    }
    if let Some(color) = &req.color {
        validate_color(color)?;
    }
    if let Some(position) = req.position {
        if position < 0 {
            return Err(ValidationError::new("position", "не может быть отрицательной"));
        }
    }
    Ok(())
}

fn validate_server_fields(
    name: &str,
    ip: &str,
    provider: &str,
    price: f64,
    currency: &str,
    payment_date: &str,
) -> Result<(), ValidationError> {
    validate_name("name", name)?;
    validate_ip(ip)?;
    validate_provider(provider)?;
    validate_price(price)?;
    validate_currency(currency)?;
    validate_payment_date(payment_date)
}

pub fn validate_create_server(req: &CreateServerRequest) -> Result<(), ValidationError> {
    validate_server_fields(
        &req.name,
        &req.ip,
        &req.provider,
        req.price,
        &req.currency,
        &req.payment_date,
    )
}

pub fn validate_update_server(req: &UpdateServerRequest) -> Result<(), ValidationError> {
    if let Some(name) = &req.name {
        validate_name("name", name)?;
    }
    if let Some(ip) = &req.ip {
        validate_ip(ip)?;
    }
    if let Some(provider) = &req.provider {
        validate_provider(provider)?;
    }
    if let Some(price) = req.price {
        validate_price(price)?;
    }
    if let Some(currency) = &req.currency {
        validate_currency(currency)?;
    }
    if let Some(payment_date) = &req.payment_date {
        validate_payment_date(payment_date)?;
    }
    Ok(())
}

pub fn validate_folder_export(folder: &FolderExport) -> Result<(), ValidationError> {
    validate_name("name", &folder.name)?;
    validate_color(&folder.color)?;
    folder.servers.iter().try_for_each(validate_server_export)
}

pub fn validate_server_export(s: &ServerExport) -> Result<(), ValidationError> {
    validate_server_fields(&s.name, &s.ip, &s.provider, s.price, &s.currency, &s.payment_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color() {
        assert!(validate_color("#6b7280").is_ok());
        assert!(validate_color("#ABCDEF").is_ok());
        assert!(validate_color("6b7280").is_err());
        assert!(validate_color("#6b728").is_err());
        assert!(validate_color("#6b728g").is_err());
    }

    #[test]
    fn test_server_fields() {
        let mut req = CreateServerRequest {
            folder_id: 1,
            name: "ams-1".into(),
            ip: "203.0.113.7".into(),
            provider: "Hetzner".into(),
            price: 4.5,
            currency: "EUR".into(),
            payment_date: "12".into(),
        };
        assert!(validate_create_server(&req).is_ok());

        req.price = -1.0;
        assert_eq!(validate_create_server(&req).unwrap_err().field, "price");
        req.price = 0.0;
        req.payment_date = "40".into();
        assert_eq!(validate_create_server(&req).unwrap_err().field, "payment_date");
        req.payment_date = "-".into();
        req.name = "   ".into();
        assert_eq!(validate_create_server(&req).unwrap_err().field, "name");
    }

    #[test]
    fn test_partial_update_checks_only_present_fields() {
        assert!(validate_update_server(&UpdateServerRequest::default()).is_ok());
        let bad = UpdateServerRequest {
            currency: Some("EURO".into()),
            ..Default::default()
        };
        assert_eq!(validate_update_server(&bad).unwrap_err().field, "currency");
    }
}
