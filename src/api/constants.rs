//! API Constants and endpoint helpers for the Creatio OData service

/// Path of the OData v3 entity service, relative to the site URL
pub const ENTITY_SERVICE_PATH: &str = "/0/ServiceModel/EntityDataService.svc";

/// Session login endpoint, relative to the site URL
pub const LOGIN_PATH: &str = "/ServiceModel/AuthService.svc/Login";

/// Token endpoint of the identity service, relative to the identity URL
pub const TOKEN_PATH: &str = "/connect/token";

/// Name of the anti-forgery cookie issued on session login
pub const CSRF_COOKIE: &str = "BPMCSRF";

/// Default number of rows requested by a read
pub const DEFAULT_READ_LIMIT: u32 = 10_000;

/// Lookup value Creatio uses for "not set"
pub const EMPTY_GUID: &str = "00000000-0000-0000-0000-000000000000";

/// Standard headers for Creatio requests
pub mod headers {
    /// Verbose OData JSON, used for both Accept and Content-Type
    pub const ODATA_VERBOSE_JSON: &str = "application/json;odata=verbose";

    /// Plain JSON, used by the login endpoint
    pub const CONTENT_TYPE_JSON: &str = "application/json";

    /// Anti-forgery header echoing the BPMCSRF cookie
    pub const CSRF: &str = "BPMCSRF";

    /// Forces the server to use the cookie session instead of basic auth
    pub const FORCE_USE_SESSION: &str = "ForceUseSession";

    /// Correlation header attached to every request for log matching
    pub const X_CORRELATION_ID: &str = "X-Correlation-Id";
}

/// HTTP methods for operations
pub mod methods {
    pub const GET: &str = "GET";
    pub const POST: &str = "POST";
    pub const PUT: &str = "PUT";
    pub const DELETE: &str = "DELETE";
}

/// Build the collection endpoint URL
pub fn entity_endpoint(base_url: &str, collection: &str) -> String {
    format!("{}{}/{}", trim_base(base_url), ENTITY_SERVICE_PATH, collection)
}

/// Build the endpoint URL used to create a record in a collection
pub fn create_endpoint(base_url: &str, collection: &str) -> String {
    format!("{}/", entity_endpoint(base_url, collection))
}

/// Build the record endpoint URL, `Collection(guid'<id>')`
pub fn entity_record_endpoint(base_url: &str, collection: &str, id: &str) -> String {
    format!("{}(guid'{}')", entity_endpoint(base_url, collection), id)
}

/// Build the session login URL
pub fn login_endpoint(base_url: &str) -> String {
    format!("{}{}", trim_base(base_url), LOGIN_PATH)
}

/// Build the OAuth token URL
pub fn token_endpoint(identity_url: &str) -> String {
    format!("{}{}", trim_base(identity_url), TOKEN_PATH)
}

fn trim_base(url: &str) -> &str {
    url.trim_end_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_endpoint_wraps_guid() {
        let url = entity_record_endpoint(
            "https://site.creatio.com",
            "OrderCollection",
            "51d67a11-703f-4f86-9814-e079ee362cab",
        );
        assert_eq!(
            url,
            "https://site.creatio.com/0/ServiceModel/EntityDataService.svc/OrderCollection(guid'51d67a11-703f-4f86-9814-e079ee362cab')"
        );
    }

    #[test]
    fn test_collection_follows_service_path() {
        assert_eq!(
            entity_endpoint("https://site.creatio.com/", "ContactCollection"),
            "https://site.creatio.com/0/ServiceModel/EntityDataService.svc/ContactCollection"
        );
        assert!(create_endpoint("https://site.creatio.com", "ContactCollection").ends_with("ContactCollection/"));
    }

    #[test]
    fn test_auth_endpoints() {
        assert_eq!(
            token_endpoint("https://site-is.creatio.com/"),
            "https://site-is.creatio.com/connect/token"
        );
        assert_eq!(
            login_endpoint("https://site.creatio.com"),
            "https://site.creatio.com/ServiceModel/AuthService.svc/Login"
        );
    }
}
