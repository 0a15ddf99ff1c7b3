//! Shared fixtures: a scripted mod-host mock and a canned discovery
//! adapter.

#![allow(dead_code)]

use modhost_bridge::error::Result;
use modhost_bridge::plugins::PluginDiscovery;
use modhost_bridge::types::{
    PluginEssentials, PluginGui, PluginGuiMini, PluginInfo, PluginPort, PluginPorts, PluginPreset,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Scripted engine command port: reads one NUL-terminated command per
/// connection, records it, and replies with whatever the responder
/// returns (NUL-terminated, then close - matching mod-host).
pub struct MockEngine {
    addr: SocketAddr,
    commands: Arc<Mutex<Vec<String>>>,
}

impl MockEngine {
    pub async fn spawn<F>(respond: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let log = commands.clone();
        let respond = Arc::new(respond);

        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let log = log.clone();
                let respond = respond.clone();
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    loop {
                        match stream.read(&mut chunk).await {
                            Ok(0) => break,
                            Ok(n) => {
                                buf.extend_from_slice(&chunk[..n]);
                                if buf.contains(&0) {
                                    break;
                                }
                            }
                            Err(_) => return,
                        }
                    }
                    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
                    let command = String::from_utf8_lossy(&buf[..end]).to_string();
                    if command.is_empty() {
                        return;
                    }
                    log.lock().unwrap().push(command.clone());
                    let reply = respond(&command);
                    let _ = stream.write_all(reply.as_bytes()).await;
                    let _ = stream.write_all(&[0]).await;
                });
            }
        });

        Self { addr, commands }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }
}

/// Discovery adapter backed by a fixed catalog.
pub struct MockDiscovery {
    catalog: HashMap<String, PluginInfo>,
    presets: HashMap<String, Vec<PluginPreset>>,
}

impl MockDiscovery {
    pub fn new(plugins: Vec<PluginInfo>) -> Self {
        let mut catalog = HashMap::new();
        for plugin in plugins {
            catalog.insert(plugin.uri.clone(), plugin);
        }
        Self {
            catalog,
            presets: HashMap::new(),
        }
    }

    pub fn with_presets(mut self, plugin_uri: &str, presets: Vec<PluginPreset>) -> Self {
        self.presets.insert(plugin_uri.to_string(), presets);
        self
    }
}

impl PluginDiscovery for MockDiscovery {
    fn scan_all(&self) -> Result<HashMap<String, PluginInfo>> {
        Ok(self.catalog.clone())
    }

    fn get_info(&self, uri: &str) -> Result<Option<PluginInfo>> {
        Ok(self.catalog.get(uri).cloned())
    }

    fn get_presets(&self, plugin_uri: &str) -> Result<Vec<PluginPreset>> {
        Ok(self.presets.get(plugin_uri).cloned().unwrap_or_default())
    }

    fn load_preset(&self, plugin_uri: &str, preset_uri: &str) -> Result<Option<PluginPreset>> {
        Ok(self
            .presets
            .get(plugin_uri)
            .and_then(|presets| presets.iter().find(|p| p.uri == preset_uri))
            .cloned())
    }

    fn save_preset(&self, plugin_uri: &str, _preset: &PluginPreset) -> Result<bool> {
        Ok(self.catalog.contains_key(plugin_uri))
    }

    fn validate_preset(&self, plugin_uri: &str, preset_uri: &str) -> Result<bool> {
        Ok(self
            .presets
            .get(plugin_uri)
            .map(|presets| presets.iter().any(|p| p.uri == preset_uri))
            .unwrap_or(false))
    }

    fn rescan_presets(&self, _plugin_uri: &str) -> Result<()> {
        Ok(())
    }

    fn get_gui(&self, _plugin_uri: &str) -> Result<Option<PluginGui>> {
        Ok(None)
    }

    fn get_gui_mini(&self, _plugin_uri: &str) -> Result<Option<PluginGuiMini>> {
        Ok(None)
    }

    fn get_essentials(&self, _plugin_uri: &str) -> Result<Option<PluginEssentials>> {
        Ok(None)
    }

    fn is_bundle_loaded(&self, _bundle_path: &str) -> Result<bool> {
        Ok(false)
    }

    fn add_bundle(&self, _bundle_path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn remove_bundle(&self, _bundle_path: &str, _resource_path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn list_in_bundle(&self, _bundle_path: &str) -> Result<Vec<String>> {
        Ok(self.catalog.keys().cloned().collect())
    }
}

fn audio_ports(count: usize) -> Vec<PluginPort> {
    (0..count as u32)
        .map(|index| PluginPort {
            index,
            symbol: format!("audio_{index}"),
            name: format!("Audio {index}"),
            ..Default::default()
        })
        .collect()
}

pub fn plugin_with_ports(uri: &str, name: &str, inputs: usize, outputs: usize) -> PluginInfo {
    PluginInfo {
        uri: uri.into(),
        name: name.into(),
        brand: "Test".into(),
        version: "1.0".into(),
        ports: PluginPorts {
            audio_inputs: audio_ports(inputs),
            audio_outputs: audio_ports(outputs),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn stereo_plugin(uri: &str, name: &str) -> PluginInfo {
    plugin_with_ports(uri, name, 2, 2)
}

/// Wait for the next published event and decode it.
pub async fn next_event(rx: &mut broadcast::Receiver<String>) -> serde_json::Value {
    let line = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed");
    serde_json::from_str(&line).expect("event was not valid JSON")
}
