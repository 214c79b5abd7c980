//! Process-wide registry of adapter factories keyed by handler type.
//!
//! `#[handler]` submits a [`GeneratedAdaptor`] for its function through
//! `inventory`; every submission is loaded the first time the registry is
//! touched. Handler types without one get the runtime adapter factory inserted
//! on first use.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::adapter::Adapter;
use crate::error::Result;

/// Builds an adapter from the type-erased handler value.
pub type AdaptorFactory = fn(&dyn Any) -> Result<Adapter>;

pub struct GeneratedAdaptor {
    pub key: fn() -> TypeId,
    pub name: &'static str,
    pub factory: AdaptorFactory,
}

inventory::collect!(GeneratedAdaptor);

#[derive(Clone, Copy)]
struct Registration {
    name: &'static str,
    factory: AdaptorFactory,
}

static ADAPTORS: Lazy<RwLock<HashMap<TypeId, Registration>>> = Lazy::new(|| {
    let mut adaptors = HashMap::new();
    for generated in inventory::iter::<GeneratedAdaptor> {
        tracing::debug!(name = generated.name, "loaded generated adaptor");
        adaptors.insert(
            (generated.key)(),
            Registration {
                name: generated.name,
                factory: generated.factory,
            },
        );
    }
    RwLock::new(adaptors)
});

/// Registers `factory` for handlers of type `key`. A later registration for
/// the same key replaces the earlier one.
pub fn register_adaptor(key: TypeId, name: &'static str, factory: AdaptorFactory) {
    ADAPTORS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(key, Registration { name, factory });
}

pub fn registered(key: TypeId) -> Option<AdaptorFactory> {
    ADAPTORS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .map(|registration| registration.factory)
}

/// The factory registered for `key`, inserting `fallback` on a miss.
pub fn adaptor_for(key: TypeId, name: &'static str, fallback: AdaptorFactory) -> AdaptorFactory {
    if let Some(factory) = registered(key) {
        return factory;
    }

    let mut adaptors = ADAPTORS.write().unwrap_or_else(PoisonError::into_inner);
    let registration = adaptors.entry(key).or_insert_with(|| {
        tracing::warn!(
            handler = name,
            "no generated adaptor, using the runtime adaptor; annotate the function with #[handler] to pre-generate one"
        );
        Registration {
            name,
            factory: fallback,
        }
    });
    tracing::debug!(handler = registration.name, "adaptor ready");
    registration.factory
}

pub fn type_key<T: 'static>(_value: &T) -> TypeId {
    TypeId::of::<T>()
}

/// Downcasts `value` to the type of `witness`, for code that can name a value
/// but not its type (function items).
pub fn downcast_like<'a, T: 'static>(value: &'a dyn Any, _witness: &T) -> Option<&'a T> {
    value.downcast_ref::<T>()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::error::Error;

    struct Marker;
    struct Other;
    struct Logged;

    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn refuse(_value: &dyn Any) -> Result<Adapter> {
        Err(Error::AdaptorMismatch("refuse"))
    }

    fn refuse_again(_value: &dyn Any) -> Result<Adapter> {
        Err(Error::AdaptorMismatch("refuse_again"))
    }

    fn message(factory: AdaptorFactory) -> String {
        match factory(&()) {
            Err(err) => err.to_string(),
            Ok(_) => String::from("adapter"),
        }
    }

    #[test]
    fn fallback_is_inserted_once() {
        let key = TypeId::of::<Marker>();
        assert!(registered(key).is_none());

        let first = adaptor_for(key, "marker", refuse);
        assert!(message(first).contains("refuse"));

        let second = adaptor_for(key, "marker", refuse_again);
        assert!(!message(second).contains("refuse_again"));
        assert!(registered(key).is_some());
    }

    #[test]
    fn fallback_warns_once_per_handler_type() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let key = TypeId::of::<Logged>();
            adaptor_for(key, "logged", refuse);
            adaptor_for(key, "logged", refuse);
            adaptor_for(key, "logged", refuse_again);
        });

        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert_eq!(logs.matches("no generated adaptor").count(), 1, "{logs}");
        assert!(logs.contains("logged"), "{logs}");
    }

    #[test]
    fn last_registration_wins() {
        let key = TypeId::of::<Other>();
        register_adaptor(key, "other", refuse);
        register_adaptor(key, "other", refuse_again);
        assert!(message(adaptor_for(key, "other", refuse)).contains("refuse_again"));
    }

    #[test]
    fn downcast_like_uses_the_witness_type() {
        fn witness() {}
        let value: &dyn Any = &witness;
        assert!(downcast_like(value, &witness).is_some());
        assert!(downcast_like(value, &0u8).is_none());
        assert_eq!(type_key(&witness), (*value).type_id());
    }
}
