// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use bcachefs_exporter::api::run_exporter;
use bcachefs_exporter::cli::Cli;
use bcachefs_exporter::common::config::ExporterConfig;
use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ExporterConfig::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run_exporter(config).await {
        tracing::error!("Exporter stopped: {e}");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
