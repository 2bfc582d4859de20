//! Environment-driven service configuration.
//!
//! All settings are resolved once at startup via [`Settings::from_env`];
//! missing required variables produce a typed error instead of a panic deep
//! inside a request. Optional variables gate capabilities (vector retrieval,
//! web search, local models) that the service degrades without.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingVar(&'static str),
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn or_default(name: &str, default: &str) -> String {
    optional(name).unwrap_or_else(|| default.to_string())
}

/// Managed auth backend (login + JWKS discovery).
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub base_url: String,
    pub anon_key: String,
}

impl AuthSettings {
    pub fn jwks_url(&self) -> String {
        format!("{}/auth/v1/.well-known/jwks.json", self.base_url.trim_end_matches('/'))
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/auth/v1/token?grant_type=password",
            self.base_url.trim_end_matches('/')
        )
    }
}

/// Chat-completion provider (OpenAI-compatible endpoint).
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_base: String,
    /// Model used by the diagnostic analyzer.
    pub chat_model: String,
    /// Model used by the agent team coordinator and members.
    pub team_model: String,
}

/// Vector store access. Absent entirely when `QDRANT_URL` is unset.
#[derive(Debug, Clone)]
pub struct QdrantSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub collection: String,
}

/// Multimodal model endpoint (Ollama-compatible).
#[derive(Debug, Clone)]
pub struct VisionSettings {
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_addr: String,
    pub database_path: String,
    pub upload_dir: String,
    pub auth: AuthSettings,
    pub llm: LlmSettings,
    pub qdrant: Option<QdrantSettings>,
    pub vision: VisionSettings,
    pub serpapi_key: Option<String>,
    /// Directory holding `model.onnx` + `tokenizer.json` for the query embedder.
    pub embed_model_dir: Option<String>,
    /// Path to the tabular classifier's `model.onnx`.
    pub cancer_model_path: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let auth = AuthSettings {
            base_url: require("SUPABASE_URL")?,
            anon_key: require("SUPABASE_ANON_KEY")?,
        };

        let llm = LlmSettings {
            api_key: require("GROQ_API_KEY")?,
            api_base: or_default("GROQ_API_BASE", "https://api.groq.com/openai/v1"),
            chat_model: or_default("GROQ_CHAT_MODEL", "llama-3.1-8b-instant"),
            team_model: or_default("GROQ_TEAM_MODEL", "qwen/qwen3-32b"),
        };

        let qdrant = optional("QDRANT_URL").map(|url| QdrantSettings {
            url,
            api_key: optional("QDRANT_API_KEY"),
            collection: or_default("QDRANT_COLLECTION", "cancer_rag"),
        });

        let vision = VisionSettings {
            base_url: or_default("OLLAMA_URL", "http://localhost:11434"),
            model: or_default("VISION_MODEL", "alibayram/medgemma:4b"),
        };

        Ok(Settings {
            server_addr: or_default("SERVER_ADDR", "0.0.0.0:8000"),
            database_path: or_default("DATABASE_PATH", "data/oncoscope.db"),
            upload_dir: or_default("UPLOAD_DIR", "uploads"),
            auth,
            llm,
            qdrant,
            vision,
            serpapi_key: optional("SERPAPI_KEY"),
            embed_model_dir: optional("EMBED_MODEL_DIR"),
            cancer_model_path: optional("CANCER_MODEL_PATH"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_required_env<T>(f: impl FnOnce() -> T) -> T {
        std::env::set_var("SUPABASE_URL", "https://proj.supabase.co");
        std::env::set_var("SUPABASE_ANON_KEY", "anon");
        std::env::set_var("GROQ_API_KEY", "gsk_test");
        let out = f();
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_ANON_KEY");
        std::env::remove_var("GROQ_API_KEY");
        out
    }

    // Environment mutation is process-global, so both cases live in one test.
    #[test]
    fn env_resolution() {
        std::env::remove_var("SUPABASE_URL");
        std::env::remove_var("SUPABASE_ANON_KEY");
        std::env::remove_var("GROQ_API_KEY");
        let err = Settings::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));

        let settings = with_required_env(|| Settings::from_env()).unwrap();
        assert_eq!(settings.server_addr, "0.0.0.0:8000");
        assert_eq!(settings.llm.chat_model, "llama-3.1-8b-instant");
        assert_eq!(settings.llm.api_base, "https://api.groq.com/openai/v1");
        assert!(settings.qdrant.is_none());
        assert!(settings.serpapi_key.is_none());
    }

    #[test]
    fn jwks_url_strips_trailing_slash() {
        let auth = AuthSettings {
            base_url: "https://proj.supabase.co/".into(),
            anon_key: "anon".into(),
        };
        assert_eq!(
            auth.jwks_url(),
            "https://proj.supabase.co/auth/v1/.well-known/jwks.json"
        );
    }
}
