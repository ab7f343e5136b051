//! Cross-module tests: ingestion, retrieval and generation against a real
//! LanceDB index on disk, with the trigram embedder and a scripted model.

mod retrieval;

use crate::config::{BuildOptions, ChunkingOptions, RetrievalOptions};
use crate::embeddings::providers::MockProvider;
use crate::embeddings::EmbeddingProvider;
use crate::IndexBuilder;
use flashcards_core::{AppError, AppResult};
use flashcards_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub(crate) const DIMENSIONS: usize = 2048;

pub(crate) const PHOTOSYNTHESIS: &str = "Fotosintesis adalah proses tumbuhan mengubah energi \
    cahaya menjadi energi kimia. Proses fotosintesis terjadi di kloroplas yang mengandung klorofil.";

pub(crate) const COOKING: &str = "Resep nasi goreng membutuhkan bawang merah, kecap manis \
    dan telur ayam kampung.";

pub(crate) struct Fixture {
    pub temp: TempDir,
    pub embedder: Arc<dyn EmbeddingProvider>,
}

impl Fixture {
    pub fn new(documents: &[(&str, &str)]) -> Self {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("documents");
        fs::create_dir_all(&dir).unwrap();
        for (name, text) in documents {
            fs::write(dir.join(name), text).unwrap();
        }

        Self {
            temp,
            embedder: Arc::new(MockProvider::new(DIMENSIONS)),
        }
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.temp.path().join("documents")
    }

    pub fn index_dir(&self) -> PathBuf {
        self.temp.path().join("flashcard_index")
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            documents_dir: self.documents_dir(),
            index_dir: self.index_dir(),
            chunking: ChunkingOptions::default(),
            batch_size: 2,
            batch_delay: Duration::ZERO,
            rate_limit_retries: 0,
            initial_backoff: Duration::from_millis(1),
        }
    }

    pub fn retrieval_options(&self, score_threshold: f32) -> RetrievalOptions {
        RetrievalOptions {
            index_dir: self.index_dir(),
            score_threshold,
            top_k: 4,
        }
    }

    pub async fn build(&self) -> AppResult<crate::BuildStats> {
        IndexBuilder::new(self.embedder.clone(), self.build_options())
            .build()
            .await
    }
}

/// What the scripted model does when called.
pub(crate) enum Reply {
    Text(&'static str),
    Fail(&'static str),
}

/// Language model returning a fixed reply and recording every prompt.
pub(crate) struct ScriptedLlm {
    reply: Reply,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedLlm {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.prompts.lock().unwrap().push(request.prompt.clone());
        match self.reply {
            Reply::Text(content) => Ok(LlmResponse {
                content: content.to_string(),
                model: request.model.clone(),
                usage: LlmUsage::new(10, 10),
            }),
            Reply::Fail(message) => Err(AppError::Llm(message.to_string())),
        }
    }
}
