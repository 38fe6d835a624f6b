//! # Video Metadata Updater Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Gestione configurazione e validazione parametri
//! - `error`: Tipi di errore custom per ogni fase
//! - `file_manager`: Discovery dei video e operazioni sui file
//! - `nfo` / `metadata`: Parsing del sidecar e traduzione in tag
//! - `probe`: Lettura di stream e tag con ffprobe
//! - `transcoder`: Comando ffmpeg e sua esecuzione
//! - `validator` / `executor`: Transazione backup → ffmpeg → validazione → commit
//! - `processor`: Pool di worker e loop di retry
//! - `progress`: Progress tracking e statistiche
//! - `report`: Report JSON dei risultati
//!
//! ## Utilizzo:
//! ```ignore
//! use video_metadata_updater::{platform, Config, Processor, Toolchain};
//!
//! let config = Config::default();
//! let tools = platform::check_dependencies(&config)?;
//! let processor = Processor::new(&config, Toolchain::from_tools(&tools, &config));
//! let results = processor.process_directory(&path).await?;
//! ```

pub mod config;
pub mod error;
pub mod executor;
pub mod file_manager;
pub mod metadata;
pub mod nfo;
pub mod platform;
pub mod probe;
pub mod processor;
pub mod progress;
pub mod report;
pub mod transcoder;
pub mod utils;
pub mod validator;

pub use config::Config;
pub use error::{PipelineError, VmuError};
pub use processor::{ProcessResult, ProcessStatus, Processor, Toolchain};
pub use progress::RunSummary;
