//! Process-default container

use crate::container::ServiceContainer;
use crate::errors::ContainerError;
use crate::value::Instance;
use parking_lot::RwLock;

lazy_static::lazy_static! {
    static ref GLOBAL_CONTAINER: RwLock<ServiceContainer> = RwLock::new(ServiceContainer::new());
}

/// Handle to the process-default container (shares state with the global).
pub fn container() -> ServiceContainer {
    GLOBAL_CONTAINER.read().clone()
}

/// Replace the process-default container, returning the previous one.
pub fn set_container(container: ServiceContainer) -> ServiceContainer {
    tracing::debug!("replacing global container");
    std::mem::replace(&mut *GLOBAL_CONTAINER.write(), container)
}

/// Resolve `abstract_id` through the process-default container.
pub fn app(abstract_id: &str) -> Result<Instance, ContainerError> {
    container().make(abstract_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::MockService;
    use std::sync::Arc;

    #[test]
    fn global_round_trip() {
        let fresh = ServiceContainer::new();
        fresh.instance("global.test.clock", Arc::new(MockService::new("Clock")));
        let previous = set_container(fresh.clone());

        let clock = app("global.test.clock").unwrap();
        assert_eq!(clock.type_name(), "Clock");
        assert!(container().same_as(&fresh));

        set_container(previous);
        assert!(app("global.test.clock").is_err());
    }
}
