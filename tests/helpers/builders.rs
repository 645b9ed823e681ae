use sea_orm::DatabaseConnection;
use syzygy::storage;

/// Builder for registered client applications
pub struct ClientAppBuilder {
    client_id: String,
    application_name: String,
    callback_uri: Option<String>,
}

impl ClientAppBuilder {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            application_name: "Test App".to_string(),
            callback_uri: None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.application_name = name.to_string();
        self
    }

    pub fn with_callback(mut self, uri: &str) -> Self {
        self.callback_uri = Some(uri.to_string());
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::ClientApp {
        storage::create_client_app(
            db,
            storage::NewClientApp {
                client_id: self.client_id,
                application_name: self.application_name,
                callback_uri: self.callback_uri,
            },
        )
        .await
        .expect("Failed to create client app")
    }
}

/// Builder for pending device-authorization attempts
pub struct DeviceFlowBuilder {
    user_code: String,
    client_id: String,
    scope: String,
    ttl_secs: i64,
}

impl DeviceFlowBuilder {
    pub fn new(user_code: &str) -> Self {
        Self {
            user_code: user_code.to_string(),
            client_id: "app1".to_string(),
            scope: "read".to_string(),
            ttl_secs: 1800,
        }
    }

    pub fn for_client(mut self, client_id: &str) -> Self {
        self.client_id = client_id.to_string();
        self
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    pub async fn create(self, db: &DatabaseConnection) -> storage::DeviceFlow {
        storage::create_device_flow(
            db,
            storage::NewDeviceFlow {
                user_code: self.user_code,
                client_id: self.client_id,
                scope: self.scope,
                ttl_secs: self.ttl_secs,
            },
        )
        .await
        .expect("Failed to create device flow")
    }
}
