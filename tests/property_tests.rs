//! Property-based tests for core types and the handle lifecycle.
//!
//! These tests use proptest to verify invariants hold across
//! randomly generated inputs.

use std::sync::Arc;

use proptest::prelude::*;
use tempfile::TempDir;

use gitfacade::core::handle::{HandleError, HandleState, RepositoryHandle};
use gitfacade::core::registry::{HandleRegistry, RegistryError};
use gitfacade::core::types::{BranchName, HandleId, Oid, Pathspec};

/// Strategy for generating valid branch name characters.
fn branch_name_char() -> impl Strategy<Value = char> {
    prop_oneof![
        prop::char::range('a', 'z'),
        prop::char::range('A', 'Z'),
        prop::char::range('0', '9'),
        Just('-'),
        Just('_'),
        Just('.'),
        Just('/'),
    ]
}

/// Strategy for generating valid branch names.
fn valid_branch_name() -> impl Strategy<Value = String> {
    prop::collection::vec(branch_name_char(), 1..50).prop_filter_map(
        "must be valid branch name",
        |chars| {
            let name: String = chars.into_iter().collect();
            if name.starts_with('-')
                || name.ends_with('/')
                || name.contains("..")
                || name.contains("//")
                || name
                    .split('/')
                    .any(|c| c.starts_with('.') || c.ends_with(".lock"))
            {
                None
            } else {
                Some(name)
            }
        },
    )
}

/// Strategy for generating valid OID strings (40 hex chars).
fn valid_oid_string() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![prop::char::range('0', '9'), prop::char::range('a', 'f')],
        40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #[test]
    fn branch_name_serde_roundtrip(name in valid_branch_name()) {
        let branch = BranchName::new(&name).unwrap();
        let json = serde_json::to_string(&branch).unwrap();
        let parsed: BranchName = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(branch, parsed);
    }

    #[test]
    fn branch_name_local_ref(name in valid_branch_name()) {
        let branch = BranchName::new(&name).unwrap();
        prop_assert_eq!(branch.local_ref(), format!("refs/heads/{}", name));
    }

    #[test]
    fn branch_name_rejects_forbidden_chars(
        prefix in "[a-z]{1,10}",
        bad in prop::sample::select(vec![' ', '~', '^', ':', '\\', '?', '*', '[']),
        suffix in "[a-z]{0,10}",
    ) {
        let name = format!("{}{}{}", prefix, bad, suffix);
        prop_assert!(BranchName::new(name).is_err());
    }

    #[test]
    fn oid_normalized_to_lowercase(oid_str in valid_oid_string()) {
        let upper = oid_str.to_uppercase();
        let oid = Oid::new(&upper).unwrap();
        prop_assert_eq!(oid.as_str(), oid_str.as_str());
    }

    #[test]
    fn oid_short_is_prefix(oid_str in valid_oid_string(), len in 1usize..40) {
        let oid = Oid::new(&oid_str).unwrap();
        let short = oid.short(len);
        prop_assert_eq!(short.len(), len);
        prop_assert!(oid.as_str().starts_with(short));
    }

    #[test]
    fn pathspec_keeps_patterns_in_order(patterns in prop::collection::vec("[a-z*]{1,8}", 1..6)) {
        let spec = Pathspec::from(patterns.clone());
        prop_assert_eq!(spec.patterns(), patterns.as_slice());
        prop_assert!(!spec.is_empty());
    }

    #[test]
    fn handle_ids_strictly_increase(count in 1usize..50) {
        let ids: Vec<HandleId> = (0..count).map(|_| HandleId::next()).collect();
        for pair in ids.windows(2) {
            prop_assert!(pair[0].get() < pair[1].get());
        }
    }
}

// =============================================================================
// Registry and handle lifecycle
// =============================================================================

/// One step applied to a pool of handles.
#[derive(Debug, Clone)]
enum Step {
    Open(usize),
    Free(usize),
    /// Drop the handle and put a fresh one in its slot.
    Replace(usize),
}

const POOL: usize = 4;

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (0..POOL).prop_map(Step::Open),
        (0..POOL).prop_map(Step::Free),
        (0..POOL).prop_map(Step::Replace),
    ]
}

fn registry_ids() -> impl Strategy<Value = Vec<(bool, u8)>> {
    prop::collection::vec((any::<bool>(), 0u8..6), 0..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn open_handle_count_matches_registry(steps in prop::collection::vec(step(), 0..30)) {
        let repo = TempDir::new().unwrap();
        git2::Repository::init(repo.path()).unwrap();
        let registry = Arc::new(HandleRegistry::new());

        let mut pool: Vec<RepositoryHandle> = (0..POOL)
            .map(|_| RepositoryHandle::new(repo.path(), Arc::clone(&registry)))
            .collect();

        for step in steps {
            match step {
                Step::Open(i) => {
                    let before = pool[i].state();
                    let result = pool[i].open();
                    let expected = match before {
                        HandleState::Unopened => result.is_ok(),
                        HandleState::Open => {
                            matches!(result, Err(HandleError::AlreadyOpen { .. }))
                        }
                        HandleState::Released => {
                            matches!(result, Err(HandleError::Released { .. }))
                        }
                    };
                    prop_assert!(expected, "open from {:?} returned {:?}", before, result);
                }
                Step::Free(i) => {
                    pool[i].free();
                    prop_assert_eq!(pool[i].state(), HandleState::Released);
                    prop_assert!(pool[i].git().is_err());
                }
                Step::Replace(i) => {
                    pool[i] = RepositoryHandle::new(repo.path(), Arc::clone(&registry));
                }
            }

            let open = pool.iter().filter(|h| h.is_open()).count();
            prop_assert_eq!(registry.size(), open);
            for handle in &pool {
                prop_assert_eq!(registry.contains(handle.id()), handle.is_open());
            }
        }

        drop(pool);
        prop_assert_eq!(registry.size(), 0);
    }

    #[test]
    fn registry_tracks_distinct_ids(ops in registry_ids()) {
        let registry = HandleRegistry::new();
        let ids: Vec<HandleId> = (0..6).map(|_| HandleId::next()).collect();
        let mut model = std::collections::HashSet::new();

        for (register, slot) in ops {
            let id = ids[slot as usize];
            if register {
                let result = registry.register(id);
                if model.insert(id) {
                    let registration = result.unwrap();
                    prop_assert_eq!(registration.open_count, model.len());
                } else {
                    let rejected = matches!(result, Err(RegistryError::AlreadyOpen { .. }));
                    prop_assert!(rejected, "second register returned {:?}", result);
                }
            } else {
                prop_assert_eq!(registry.deregister(id), model.remove(&id));
            }
            prop_assert_eq!(registry.size(), model.len());
        }
    }
}
