//! Facade dispatch integration tests

use futures_util::future;
use scoped_facade::config::FacadeSettings;
use scoped_facade::container::{MapLocator, ServiceContainer};
use scoped_facade::context;
use scoped_facade::errors::FacadeError;
use scoped_facade::facade::{Facade, FacadeDispatcher, Mock, MockService};
use scoped_facade::reflect::Factory;
use parking_lot::Mutex;
use scoped_facade::value::{args, method, Instance, MethodFn, Service, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

scoped_facade::facade!(
    /// Mail facade
    pub struct Mail as "Mail" => "mailer"
);

scoped_facade::facade!(pub struct Ghost as "Ghost" => "ghost.service");

struct Mailer {
    driver: String,
    sent: AtomicUsize,
    received: Mutex<Vec<Value>>,
}

impl Service for Mailer {
    fn type_name(&self) -> &str {
        "Mailer"
    }

    fn method(&self, name: &str) -> Option<MethodFn> {
        match name {
            "send" => Some(method::<Mailer, _>(|mailer, a| {
                if a.len() != 3 {
                    anyhow::bail!("send expects 3 arguments, got {}", a.len());
                }
                args::str(a, 0)?;
                *mailer.received.lock() = a.to_vec();
                mailer.sent.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(true))
            })),
            "getDriver" => Some(method::<Mailer, _>(|mailer, _| Ok(Value::from(mailer.driver.clone())))),
            "explode" => Some(method::<Mailer, _>(|_, _| anyhow::bail!("smtp connection refused"))),
            _ => None,
        }
    }
}

fn mailer(driver: &str) -> Mailer {
    Mailer {
        driver: driver.to_string(),
        sent: AtomicUsize::new(0),
        received: Mutex::new(Vec::new()),
    }
}

fn mail_args() -> Vec<Value> {
    vec![
        Value::from("user@example.com"),
        Value::from("Welcome"),
        Value::from("Hello there"),
    ]
}

/// Container with a singleton mailer and a dispatcher wired to it.
fn setup(settings: FacadeSettings) -> (ServiceContainer, FacadeDispatcher) {
    let container = ServiceContainer::new();
    let driver = "smtp".to_string();
    container.singleton("mailer", Factory::from_fn(move || mailer(&driver)));

    let dispatcher = FacadeDispatcher::with_settings(settings);
    dispatcher.set_container(Arc::new(container.clone()));
    Mail::bind(&dispatcher);
    (container, dispatcher)
}

fn context_safe() -> FacadeSettings {
    FacadeSettings {
        context_safe: true,
        ..FacadeSettings::default()
    }
}

#[test]
fn test_call_forwards_all_arguments() {
    let (container, dispatcher) = setup(FacadeSettings::default());

    let sent = [Value::from("a@b.com"), Value::from("s"), Value::from("b")];
    let result = Mail::call(&dispatcher, "send", &sent).unwrap();
    assert_eq!(result.as_bool(), Some(true));

    let mailer = container.make_as::<Mailer>("mailer").unwrap();
    assert_eq!(mailer.sent.load(Ordering::SeqCst), 1);
    assert_eq!(*mailer.received.lock(), sent.to_vec());
    assert!(Mail::is_resolved(&dispatcher));
}

#[test]
fn test_rebinding_is_honoured_in_both_modes() {
    let (container, dispatcher) = setup(FacadeSettings::default());
    container.singleton("mailer.smtp", Factory::from_fn(|| mailer("sendmail")));
    dispatcher.bind("Mail", "mailer.smtp");
    assert_eq!(Mail::get_service_id(&dispatcher), "mailer.smtp");

    let global = Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(global.as_str(), Some("sendmail"));

    Mail::enable_context_safe_mode(&dispatcher);
    let scoped = Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(scoped.as_str(), Some("sendmail"));
}

#[test]
fn test_unbound_context_safe_facade_uses_declared_service_id() {
    let container = ServiceContainer::new();
    container.singleton("mailer", Factory::from_fn(|| mailer("smtp")));
    let dispatcher = FacadeDispatcher::with_settings(context_safe());
    dispatcher.set_container(Arc::new(container));

    assert_eq!(Mail::get_service_id(&dispatcher), "mailer");
    let driver = Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(driver.as_str(), Some("smtp"));
}

#[test]
fn test_clear_after_mode_switch_drops_global_slot() {
    let (_container, dispatcher) = setup(FacadeSettings::default());
    let stale = Mail::get_instance(&dispatcher).unwrap();

    Mail::enable_context_safe_mode(&dispatcher);
    Mail::clear(&dispatcher);
    Mail::disable_context_safe_mode(&dispatcher);
    assert!(!Mail::is_resolved(&dispatcher));

    let replacement = Arc::new(MapLocator::new());
    replacement.set_instance("mailer", Arc::new(mailer("log")) as Instance);
    dispatcher.set_container(replacement);
    let fresh = Mail::get_instance(&dispatcher).unwrap();
    assert!(!Arc::ptr_eq(&stale, &fresh));
    assert_eq!(
        Mail::call(&dispatcher, "getDriver", &[]).unwrap().as_str(),
        Some("log")
    );
}

#[test]
fn test_unknown_facade_names_the_facade() {
    let (_container, dispatcher) = setup(FacadeSettings::default());

    let err = Ghost::call(&dispatcher, "anything", &[]).unwrap_err();
    assert!(matches!(err, FacadeError::UnknownFacade(ref id) if id == "Ghost"));
    assert!(err.to_string().contains("Ghost"));
}

#[test]
fn test_missing_container() {
    let dispatcher = FacadeDispatcher::new();
    Mail::bind(&dispatcher);
    let err = Mail::get_instance(&dispatcher).unwrap_err();
    assert!(matches!(err, FacadeError::ContainerNotSet { .. }));
}

#[test]
fn test_bound_but_unregistered_service() {
    let dispatcher = FacadeDispatcher::new();
    dispatcher.set_container(Arc::new(MapLocator::new()));
    Mail::bind(&dispatcher);

    let err = Mail::get_instance(&dispatcher).unwrap_err();
    assert!(matches!(
        err,
        FacadeError::NoResolvedInstance { ref service_id, .. } if service_id == "mailer"
    ));
}

#[test]
fn test_mock_short_circuits_and_reverts() {
    let (_container, dispatcher) = setup(FacadeSettings::default());
    let real = Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(real.as_str(), Some("smtp"));

    let double = Arc::new(MockService::new("MailMock").returning("getDriver", "mock-driver"));
    Mail::mock(&dispatcher, double.clone() as Instance);
    let mocked = Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(mocked.as_str(), Some("mock-driver"));
    assert_eq!(double.call_count("getDriver"), 1);

    assert!(Mail::clear_mock(&dispatcher));
    let restored = Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(restored.as_str(), Some("smtp"));
}

#[test]
fn test_mock_factory_is_never_cached() {
    let (_container, dispatcher) = setup(context_safe());
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    Mail::mock(
        &dispatcher,
        Mock::factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(MockService::new("MailMock").returning("getDriver", "mock")) as Instance
        }),
    );

    Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 2);
    assert!(!dispatcher.store().has("facade.resolved.Mail"));
}

#[test]
fn test_clear_forces_fresh_resolution() {
    let container = ServiceContainer::new();
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();
    container.bind(
        "mailer",
        Factory::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            mailer("smtp")
        }),
        false,
    );
    let dispatcher = FacadeDispatcher::new();
    dispatcher.set_container(Arc::new(container));
    Mail::bind(&dispatcher);

    let first = Mail::get_instance(&dispatcher).unwrap();
    let again = Mail::get_instance(&dispatcher).unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert_eq!(built.load(Ordering::SeqCst), 1);

    Mail::clear(&dispatcher);
    assert!(!Mail::is_resolved(&dispatcher));
    let fresh = Mail::get_instance(&dispatcher).unwrap();
    assert!(!Arc::ptr_eq(&first, &fresh));
    assert_eq!(built.load(Ordering::SeqCst), 2);
}

#[test]
fn test_clear_all_resets_bindings_and_mocks() {
    let (_container, dispatcher) = setup(FacadeSettings::default());
    Mail::call(&dispatcher, "getDriver", &[]).unwrap();
    Mail::mock(&dispatcher, Arc::new(MockService::new("MailMock")) as Instance);

    Mail::clear_all(&dispatcher);
    assert!(!dispatcher.bindings().is_bound("Mail"));
    assert!(!dispatcher.bindings().has_mock("Mail"));
    assert!(dispatcher.resolved_facades().is_empty());
    assert!(matches!(
        Mail::call(&dispatcher, "getDriver", &[]).unwrap_err(),
        FacadeError::UnknownFacade(_)
    ));
}

#[test]
fn test_undefined_method_and_invocation_error() {
    let (_container, dispatcher) = setup(FacadeSettings::default());

    let err = Mail::call(&dispatcher, "fly", &[]).unwrap_err();
    assert_eq!(err.to_string(), "Undefined method fly for facade Mail");

    let err = Mail::call(&dispatcher, "explode", &[]).unwrap_err();
    match &err {
        FacadeError::InvocationError { method, source, .. } => {
            assert_eq!(method, "explode");
            assert_eq!(source.to_string(), "smtp connection refused");
        }
        other => panic!("unexpected error: {other}"),
    }

    let err = Mail::call(&dispatcher, "send", &[Value::from("only-one")]).unwrap_err();
    assert!(matches!(err, FacadeError::InvocationError { .. }));
}

#[test]
fn test_has_method_is_advisory() {
    let (_container, dispatcher) = setup(FacadeSettings::default());
    assert!(Mail::has_method(&dispatcher, "send"));
    assert!(!Mail::has_method(&dispatcher, "fly"));
    assert!(!Ghost::has_method(&dispatcher, "send"));
    assert!(!Ghost::is_resolved(&dispatcher));
}

#[test]
fn test_mode_toggles_per_facade() {
    let (_container, dispatcher) = setup(FacadeSettings::default());
    assert!(!Mail::is_context_safe_mode(&dispatcher));
    Mail::enable_context_safe_mode(&dispatcher);
    assert!(Mail::is_context_safe_mode(&dispatcher));
    assert!(!Ghost::is_context_safe_mode(&dispatcher));
    Mail::disable_context_safe_mode(&dispatcher);
    assert!(!Mail::is_context_safe_mode(&dispatcher));
}

#[test]
fn test_context_safe_fibers_resolve_independently() {
    let container = ServiceContainer::new();
    container.bind("mailer", Factory::from_fn(|| mailer("smtp")), false);
    let dispatcher = FacadeDispatcher::with_settings(context_safe());
    dispatcher.set_container(Arc::new(container));

    let main = Mail::get_instance(&dispatcher).unwrap();
    let (fiber_first, fiber_again) = context::run_fiber(|| {
        (
            Mail::get_instance(&dispatcher).unwrap(),
            Mail::get_instance(&dispatcher).unwrap(),
        )
    });

    assert!(Arc::ptr_eq(&fiber_first, &fiber_again));
    assert!(!Arc::ptr_eq(&main, &fiber_first));
    assert!(Arc::ptr_eq(&main, &Mail::get_instance(&dispatcher).unwrap()));
}

#[test]
fn test_context_safe_resolution_error() {
    let dispatcher = FacadeDispatcher::with_settings(context_safe());
    dispatcher.set_container(Arc::new(MapLocator::new()));

    let err = Mail::get_instance(&dispatcher).unwrap_err();
    assert!(matches!(
        err,
        FacadeError::Resolution { ref service_id, .. } if service_id == "mailer"
    ));
}

#[test]
fn test_clear_context_facades_keeps_other_keys() {
    let (_container, dispatcher) = setup(context_safe());
    dispatcher.store().set("request.id", 7_u32);
    Mail::get_instance(&dispatcher).unwrap();
    assert!(Mail::is_resolved(&dispatcher));

    dispatcher.clear_context_facades();
    assert!(!Mail::is_resolved(&dispatcher));
    assert!(dispatcher.store().has("request.id"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_context_safe_tasks_never_share_instances() {
    let container = ServiceContainer::new();
    container.bind("mailer", Factory::from_fn(|| mailer("smtp")), false);
    let dispatcher = Arc::new(FacadeDispatcher::with_settings(context_safe()));
    dispatcher.set_container(Arc::new(container));

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                let first = Mail::get_instance(&dispatcher).unwrap();
                sleep(Duration::from_millis(3)).await;
                let second = Mail::get_instance(&dispatcher).unwrap();
                assert!(Arc::ptr_eq(&first, &second));
                Mail::call(&dispatcher, "send", &mail_args()).unwrap();
                dispatcher.clear_context_facades();
                first
            })
        })
        .collect();

    let instances: Vec<Instance> = future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    for (i, a) in instances.iter().enumerate() {
        for b in &instances[i + 1..] {
            assert!(!Arc::ptr_eq(a, b));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_global_mode_shares_one_instance_across_tasks() {
    let (_container, dispatcher) = setup(FacadeSettings::default());
    let dispatcher = Arc::new(dispatcher);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { Mail::get_instance(&dispatcher).unwrap() })
        })
        .collect();
    let instances: Vec<Instance> = future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();
    assert!(instances.iter().all(|i| Arc::ptr_eq(i, &instances[0])));
}
