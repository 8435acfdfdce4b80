//! Static-style facades over container services
//!
//! A facade is a zero-sized type naming a service id. Calls go through a
//! [`FacadeDispatcher`], which resolves the backing instance (mock first,
//! then cache, then container) and forwards the method by name.
//!
//! ```ignore
//! scoped_facade::facade!(pub struct Mail => "mailer");
//!
//! Mail::bind(&dispatcher);
//! Mail::call(&dispatcher, "send", &["a@b.com".into(), "Hi".into(), "Body".into()])?;
//! ```

pub mod binding;
pub mod dispatcher;
pub mod mock;

pub use binding::{FacadeBindingRegistry, Mock};
pub use dispatcher::{FacadeDispatcher, FacadeRef};
pub use mock::MockService;

use crate::errors::FacadeError;
use crate::value::{Instance, Service, Value};
use std::sync::Arc;

pub trait Facade: 'static {
    /// Container id of the backing service.
    fn service_id() -> &'static str;

    /// Key under which bindings, mocks and caches are held.
    fn facade_id() -> &'static str {
        std::any::type_name::<Self>()
    }

    fn facade_ref() -> FacadeRef<'static> {
        FacadeRef::new(Self::facade_id(), Self::service_id())
    }

    /// Register `facade_id -> service_id` with the dispatcher's registry.
    fn bind(dispatcher: &FacadeDispatcher) {
        dispatcher.bind(Self::facade_id(), Self::service_id());
    }

    /// Service id currently bound for this facade, falling back to its own.
    fn get_service_id(dispatcher: &FacadeDispatcher) -> String {
        dispatcher.service_id(Self::facade_ref())
    }

    fn get_instance(dispatcher: &FacadeDispatcher) -> Result<Instance, FacadeError> {
        dispatcher.resolve(Self::facade_ref())
    }

    /// Resolve and downcast to the concrete service type.
    fn instance_as<T: Service>(dispatcher: &FacadeDispatcher) -> Result<Arc<T>, FacadeError> {
        let instance = Self::get_instance(dispatcher)?;
        let actual = instance.type_name().to_string();
        instance
            .downcast_arc::<T>()
            .map_err(|_| FacadeError::TypeMismatch {
                facade: Self::facade_id().to_string(),
                expected: std::any::type_name::<T>().to_string(),
                actual,
            })
    }

    fn call(dispatcher: &FacadeDispatcher, method: &str, args: &[Value]) -> Result<Value, FacadeError> {
        dispatcher.call(Self::facade_ref(), method, args)
    }

    fn has_method(dispatcher: &FacadeDispatcher, method: &str) -> bool {
        dispatcher.has_method(Self::facade_ref(), method)
    }

    fn is_resolved(dispatcher: &FacadeDispatcher) -> bool {
        dispatcher.is_resolved(Self::facade_ref())
    }

    fn clear(dispatcher: &FacadeDispatcher) {
        dispatcher.clear(Self::facade_ref());
    }

    fn clear_all(dispatcher: &FacadeDispatcher) {
        dispatcher.clear_all(Self::facade_ref());
    }

    fn mock(dispatcher: &FacadeDispatcher, mock: impl Into<Mock>) {
        dispatcher.mock(Self::facade_id(), mock);
    }

    fn clear_mock(dispatcher: &FacadeDispatcher) -> bool {
        dispatcher.clear_mock(Self::facade_id())
    }

    fn enable_context_safe_mode(dispatcher: &FacadeDispatcher) {
        dispatcher.set_context_safe(Self::facade_id(), true);
    }

    fn disable_context_safe_mode(dispatcher: &FacadeDispatcher) {
        dispatcher.set_context_safe(Self::facade_id(), false);
    }

    fn is_context_safe_mode(dispatcher: &FacadeDispatcher) -> bool {
        dispatcher.is_context_safe(Self::facade_id())
    }
}

/// Declare a unit struct facade for a service id.
///
/// The facade id defaults to the struct's type path; pass `as "Id"` to pin it.
#[macro_export]
macro_rules! facade {
    ($(#[$meta:meta])* $vis:vis struct $name:ident => $service:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::facade::Facade for $name {
            fn service_id() -> &'static str {
                $service
            }
        }
    };
    ($(#[$meta:meta])* $vis:vis struct $name:ident as $id:literal => $service:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $name;

        impl $crate::facade::Facade for $name {
            fn service_id() -> &'static str {
                $service
            }

            fn facade_id() -> &'static str {
                $id
            }
        }
    };
}
