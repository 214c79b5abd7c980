//! Deep-zero example values for documentation.
//!
//! A deep-zero is the default value of a type where every optional field,
//! sequence and map is populated one level deep with its own deep-zero, so the
//! JSON encoding shows the full shape of the type instead of `null`s and empty
//! collections. `#[api_dto]` implements [`Example`] field by field.

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

/// Containers stop populating themselves past this depth so recursive types
/// still produce a finite example.
pub const MAX_EXAMPLE_DEPTH: usize = 4;

pub trait Example: Sized {
    fn example_at(depth: usize) -> Self;

    fn example() -> Self {
        Self::example_at(0)
    }
}

macro_rules! default_example {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Example for $ty {
                fn example_at(_depth: usize) -> Self {
                    Default::default()
                }
            }
        )*
    };
}

default_example!(
    bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64,
    String, ()
);

impl Example for Value {
    fn example_at(_depth: usize) -> Self {
        Value::Null
    }
}

impl<T: Example> Example for Option<T> {
    fn example_at(depth: usize) -> Self {
        (depth < MAX_EXAMPLE_DEPTH).then(|| T::example_at(depth + 1))
    }
}

impl<T: Example> Example for Vec<T> {
    fn example_at(depth: usize) -> Self {
        if depth < MAX_EXAMPLE_DEPTH {
            vec![T::example_at(depth + 1)]
        } else {
            Vec::new()
        }
    }
}

impl<T: Example> Example for Box<T> {
    fn example_at(depth: usize) -> Self {
        Box::new(T::example_at(depth))
    }
}

impl<K: Example + Eq + Hash, V: Example> Example for HashMap<K, V> {
    fn example_at(depth: usize) -> Self {
        let mut map = HashMap::new();
        if depth < MAX_EXAMPLE_DEPTH {
            map.insert(K::example_at(depth + 1), V::example_at(depth + 1));
        }
        map
    }
}

impl<K: Example + Ord, V: Example> Example for BTreeMap<K, V> {
    fn example_at(depth: usize) -> Self {
        let mut map = BTreeMap::new();
        if depth < MAX_EXAMPLE_DEPTH {
            map.insert(K::example_at(depth + 1), V::example_at(depth + 1));
        }
        map
    }
}
