pub mod http_analyzer;

pub use http_analyzer::HttpAnalyzer;
