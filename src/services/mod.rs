mod health;
pub mod implementations;

pub use health::ServiceHealth;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::logger::{log, LogTag};

/// Core service trait that all services must implement
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service identifier
    fn name(&self) -> &'static str;

    /// Service priority (lower = starts earlier, stops later)
    fn priority(&self) -> i32 {
        100
    }

    /// Services this service depends on
    fn dependencies(&self) -> Vec<&'static str> {
        vec![]
    }

    /// Check if service is enabled in configuration
    fn is_enabled(&self, config: &Config) -> bool {
        config.services.is_service_enabled(self.name())
    }

    /// Initialize the service
    async fn initialize(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Start the service
    async fn start(&mut self, shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String>;

    /// Stop the service
    async fn stop(&mut self) -> Result<(), String> {
        Ok(())
    }

    /// Check service health
    async fn health(&self) -> ServiceHealth {
        ServiceHealth::Healthy
    }
}

pub struct ServiceManager {
    services: HashMap<&'static str, Box<dyn Service>>,
    handles: HashMap<&'static str, Vec<JoinHandle<()>>>,
    shutdown: Arc<Notify>,
    config: Config,
}

impl ServiceManager {
    pub fn new(config: Config) -> Self {
        Self {
            services: HashMap::new(),
            handles: HashMap::new(),
            shutdown: Arc::new(Notify::new()),
            config,
        }
    }

    /// Register a service
    pub fn register(&mut self, service: Box<dyn Service>) {
        let name = service.name();
        self.services.insert(name, service);
    }

    /// Shutdown notify handed to every started service
    pub fn shutdown_notify(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Start all enabled services in dependency and priority order
    pub async fn start_all(&mut self) -> Result<(), String> {
        log(LogTag::System, "INFO", "Starting all services...");

        let enabled_services: Vec<&'static str> = self
            .services
            .iter()
            .filter(|(_, service)| service.is_enabled(&self.config))
            .map(|(name, _)| *name)
            .collect();

        let ordered = self.resolve_startup_order(&enabled_services)?;

        log(
            LogTag::System,
            "INFO",
            &format!("Service startup order: {:?}", ordered),
        );

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                service.initialize().await?;

                let handles = service.start(self.shutdown.clone()).await?;
                self.handles.insert(service_name, handles);

                log(
                    LogTag::System,
                    "SUCCESS",
                    &format!("✅ Service started: {}", service_name),
                );
            }
        }

        log(LogTag::System, "SUCCESS", "✅ All services started");
        Ok(())
    }

    /// Stop all services in reverse startup order
    pub async fn stop_all(&mut self) -> Result<(), String> {
        log(LogTag::System, "INFO", "Stopping all services...");

        self.shutdown.notify_waiters();

        let running_services: Vec<&'static str> = self.handles.keys().copied().collect();
        let mut ordered = self.resolve_startup_order(&running_services)?;
        ordered.reverse();

        for service_name in ordered {
            if let Some(service) = self.services.get_mut(service_name) {
                if let Err(e) = service.stop().await {
                    log(
                        LogTag::System,
                        "WARN",
                        &format!("Service stop error for {}: {}", service_name, e),
                    );
                }

                if let Some(handles) = self.handles.remove(service_name) {
                    for handle in handles {
                        let _ = tokio::time::timeout(
                            tokio::time::Duration::from_secs(5),
                            handle,
                        )
                        .await;
                    }
                }

                log(
                    LogTag::System,
                    "SUCCESS",
                    &format!("✅ Service stopped: {}", service_name),
                );
            }
        }

        log(LogTag::System, "SUCCESS", "✅ All services stopped");
        Ok(())
    }

    /// Resolve service startup order: dependencies first, then priority
    fn resolve_startup_order(
        &self,
        services: &[&'static str],
    ) -> Result<Vec<&'static str>, String> {
        use std::collections::HashSet;

        let mut ordered = Vec::new();
        let mut visited = HashSet::new();
        let mut visiting = HashSet::new();

        fn visit(
            name: &'static str,
            services: &HashMap<&'static str, Box<dyn Service>>,
            ordered: &mut Vec<&'static str>,
            visited: &mut HashSet<&'static str>,
            visiting: &mut HashSet<&'static str>,
        ) -> Result<(), String> {
            if visited.contains(name) {
                return Ok(());
            }

            if visiting.contains(name) {
                return Err(format!("Circular dependency detected for service: {}", name));
            }

            visiting.insert(name);

            if let Some(service) = services.get(name) {
                for dep in service.dependencies() {
                    visit(dep, services, ordered, visited, visiting)?;
                }
            }

            visiting.remove(name);
            visited.insert(name);
            ordered.push(name);

            Ok(())
        }

        for &service_name in services {
            visit(
                service_name,
                &self.services,
                &mut ordered,
                &mut visited,
                &mut visiting,
            )?;
        }

        ordered.sort_by_key(|name| {
            self.services
                .get(name)
                .map(|s| s.priority())
                .unwrap_or(100)
        });

        Ok(ordered)
    }

    /// Get health status of every registered service
    pub async fn get_health(&self) -> HashMap<&'static str, ServiceHealth> {
        let mut health = HashMap::new();
        for (name, service) in &self.services {
            health.insert(*name, service.health().await);
        }
        health
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubService {
        name: &'static str,
        priority: i32,
        deps: Vec<&'static str>,
    }

    #[async_trait]
    impl Service for StubService {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn dependencies(&self) -> Vec<&'static str> {
            self.deps.clone()
        }

        async fn start(&mut self, _shutdown: Arc<Notify>) -> Result<Vec<JoinHandle<()>>, String> {
            Ok(vec![])
        }
    }

    fn manager_with(services: Vec<StubService>) -> ServiceManager {
        let mut manager = ServiceManager::new(Config::default());
        for service in services {
            manager.register(Box::new(service));
        }
        manager
    }

    #[tokio::test]
    async fn test_startup_order_respects_priority() {
        let manager = manager_with(vec![
            StubService { name: "late", priority: 140, deps: vec![] },
            StubService { name: "early", priority: 50, deps: vec![] },
            StubService { name: "middle", priority: 60, deps: vec![] },
        ]);

        let ordered = manager
            .resolve_startup_order(&["late", "early", "middle"])
            .unwrap();
        assert_eq!(ordered, vec!["early", "middle", "late"]);
    }

    #[tokio::test]
    async fn test_startup_order_pulls_in_dependencies() {
        let manager = manager_with(vec![
            StubService { name: "trader", priority: 140, deps: vec!["market_data", "positions"] },
            StubService { name: "market_data", priority: 50, deps: vec![] },
            StubService { name: "positions", priority: 60, deps: vec![] },
        ]);

        // Only trader requested; its dependencies come along and sort first.
        let ordered = manager.resolve_startup_order(&["trader"]).unwrap();
        assert_eq!(ordered, vec!["market_data", "positions", "trader"]);
    }

    #[tokio::test]
    async fn test_circular_dependency_is_an_error() {
        let manager = manager_with(vec![
            StubService { name: "a", priority: 50, deps: vec!["b"] },
            StubService { name: "b", priority: 60, deps: vec!["a"] },
        ]);

        let err = manager.resolve_startup_order(&["a"]).unwrap_err();
        assert!(err.contains("Circular dependency"));
    }
}
