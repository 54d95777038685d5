use crate::utils::error::{EnrollError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(EnrollError::ValidationError {
            field: field_name.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(EnrollError::ValidationError {
                field: field_name.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(EnrollError::ValidationError {
            field: field_name.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EnrollError::ValidationError {
            field: field_name.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

/// 驗證端口字串：必須是 1-65535 的整數。
pub fn validate_port(field_name: &str, value: &str) -> Result<u16> {
    let trimmed = value.trim();
    match trimmed.parse::<u16>() {
        Ok(0) => Err(EnrollError::ValidationError {
            field: field_name.to_string(),
            reason: "Port must be between 1 and 65535".to_string(),
        }),
        Ok(port) => Ok(port),
        Err(_) => Err(EnrollError::ValidationError {
            field: field_name.to_string(),
            reason: format!("'{}' is not a valid port number", trimmed),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("panel_url", "https://example.com").is_ok());
        assert!(validate_url("panel_url", "http://example.com:8443").is_ok());
        assert!(validate_url("panel_url", "").is_err());
        assert!(validate_url("panel_url", "not a url").is_err());
        assert!(validate_url("panel_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_port() {
        assert_eq!(validate_port("service_port", "62050").unwrap(), 62050);
        assert_eq!(validate_port("ssh_port", " 22 ").unwrap(), 22);
        assert!(validate_port("service_port", "0").is_err());
        assert!(validate_port("service_port", "65536").is_err());
        assert!(validate_port("service_port", "not-a-port").is_err());
        assert!(validate_port("service_port", "").is_err());
    }

    #[test]
    fn test_validate_non_empty_string() {
        assert!(validate_non_empty_string("username", "admin").is_ok());
        assert!(validate_non_empty_string("username", "   ").is_err());
        assert!(validate_non_empty_string("username", "").is_err());
    }
}
