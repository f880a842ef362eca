use std::sync::Arc;

mod adapters;
mod application;
mod auth;
mod config;
mod models;
mod routes;

use adapters::{
    ElevenLabsConfig, ElevenLabsConnector, JsonCustomerDirectory, TelnyxCallControl,
    TwilioCallControl,
};
use application::{
    CallOrchestrator, ContextStore, OrchestratorConfig, SessionManager, ToolExecutor,
};
use config::ServerConfig;
use telebridge::ports::{AgentConnector, CallTransferer, ContactCenter, NoopConversationHook};
use telebridge::TelephonyProvider;
use telebridge_integration_wolkvox::{WolkvoxConfig, WolkvoxContactCenter};

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub sessions: Arc<SessionManager>,
    pub connector: Option<Arc<dyn AgentConnector>>,
    pub tools: Arc<ToolExecutor>,
    pub contact_center: Option<Arc<dyn ContactCenter>>,
    pub orchestrator: Option<Arc<CallOrchestrator>>,
    pub telnyx_control: Option<Arc<dyn CallTransferer>>,
    pub twilio_control: Option<Arc<dyn CallTransferer>>,
}

impl AppState {
    /// Call control for the carrier a media stream came from
    pub fn transferer_for(&self, provider: TelephonyProvider) -> Option<Arc<dyn CallTransferer>> {
        match provider {
            TelephonyProvider::Telnyx => self.telnyx_control.clone(),
            TelephonyProvider::Twilio => self.twilio_control.clone(),
        }
    }
}

fn build_state(config: ServerConfig) -> anyhow::Result<AppState> {
    if config.api_key.is_some() {
        tracing::info!("🔐 API key authentication enabled");
    } else {
        tracing::warn!("⚠️  No TELEBRIDGE_API_KEY set - authentication disabled");
    }

    // Conversational agent
    let connector: Option<Arc<dyn AgentConnector>> = match &config.elevenlabs {
        Some(settings) => {
            let mut agent = ElevenLabsConfig::new(&settings.api_key, &settings.agent_id);
            if let Some(ws_url) = &settings.ws_url {
                agent = agent.with_ws_url(ws_url);
            }
            tracing::info!("🤖 Conversational agent configured ({})", settings.agent_id);
            Some(Arc::new(ElevenLabsConnector::new(agent)))
        }
        None => {
            tracing::warn!("⚠️  No ELEVENLABS_API_KEY set - media streams will be rejected");
            None
        }
    };

    // Contact center
    let contact_center: Option<Arc<dyn ContactCenter>> = match &config.wolkvox {
        Some(settings) => {
            let mut wolkvox = WolkvoxConfig::new(&settings.token, &settings.server)
                .with_timeout(settings.timeout)
                .with_max_attempts(settings.max_attempts);
            if let Some(base_url) = &settings.base_url {
                wolkvox = wolkvox.with_base_url(base_url);
            }
            let contact_center = WolkvoxContactCenter::new(wolkvox)?;
            tracing::info!("🏢 Contact center connected (Wolkvox server {})", settings.server);
            Some(Arc::new(contact_center))
        }
        None => {
            tracing::warn!("⚠️  No WOLKVOX_TOKEN set - contact-center integration disabled");
            None
        }
    };

    // Customer directory backing the lookup tool
    let directory = match &config.customer_directory_path {
        Some(path) => {
            let directory = JsonCustomerDirectory::load(path)?;
            tracing::info!("📇 Customer directory loaded ({} records)", directory.len());
            directory
        }
        None => {
            tracing::warn!("⚠️  No CUSTOMER_DIRECTORY_PATH set - lookups will find nothing");
            JsonCustomerDirectory::empty()
        }
    };

    let contexts = Arc::new(ContextStore::with_retention(config.context_retention));
    let mut tools = ToolExecutor::new(Arc::new(directory), contexts);
    if let Some(contact_center) = &contact_center {
        tools = tools.with_contact_center(contact_center.clone());
    }

    // Carrier call control for SIP transfers
    let telnyx_control: Option<Arc<dyn CallTransferer>> = match &config.telnyx_api_key {
        Some(api_key) => Some(Arc::new(TelnyxCallControl::new(api_key)?)),
        None => None,
    };
    let twilio_control: Option<Arc<dyn CallTransferer>> = match &config.twilio {
        Some(settings) => Some(Arc::new(TwilioCallControl::new(
            &settings.account_sid,
            &settings.auth_token,
        )?)),
        None => None,
    };
    if config.transfer_sip_domain.is_none() {
        tracing::warn!("⚠️  No TRANSFER_SIP_DOMAIN set - agent transfers stay in the contact center");
    }

    let orchestrator = contact_center.as_ref().map(|contact_center| {
        let settings = &config.orchestrator;
        CallOrchestrator::new(
            contact_center.clone(),
            Arc::new(NoopConversationHook),
            OrchestratorConfig {
                poll_interval: settings.poll_interval,
                max_call_duration: settings.max_call_duration,
                default_skill: settings.default_skill.clone(),
                on_call_status: settings.on_call_status.clone(),
                transfer_keywords: settings.transfer_keywords.clone(),
            },
        )
    });

    Ok(AppState {
        sessions: Arc::new(SessionManager::new(config.session_retention)),
        config: Arc::new(config),
        connector,
        tools: Arc::new(tools),
        contact_center,
        orchestrator,
        telnyx_control,
        twilio_control,
    })
}

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secrets: shuttle_runtime::SecretStore,
) -> shuttle_axum::ShuttleAxum {
    tracing::info!("📞 Telebridge initializing...");

    // Local .env values fill in anything the secret store lacks
    let _ = dotenvy::dotenv();
    let config = ServerConfig::from_lookup(|key| {
        secrets.get(key).or_else(|| std::env::var(key).ok())
    })
    .map_err(anyhow::Error::from)?;

    let state = build_state(config)?;

    if let Some(orchestrator) = &state.orchestrator {
        if state.config.orchestrator.enabled {
            match orchestrator.start().await {
                Ok(()) => tracing::info!("🎛️ Orchestrator started"),
                Err(e) => tracing::warn!("⚠️  Orchestrator failed to start: {}", e),
            }
        } else {
            tracing::info!("🎛️ Orchestrator ready (start via /api/orchestrator/start)");
        }
    } else {
        tracing::warn!("⚠️  Orchestrator disabled (no contact center)");
    }

    let router = routes::app(state);

    tracing::info!("📚 Swagger UI: /swagger-ui");
    tracing::info!("✅ Telebridge ready - waiting for calls");

    Ok(router.into())
}
