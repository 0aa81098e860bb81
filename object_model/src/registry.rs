//! Registries: lock/allocation domains and the engine operations

use core::fmt;
use core::ptr::{self, NonNull};
use core::sync::atomic::Ordering;
use std::alloc::{alloc as heap_raw_alloc, dealloc as heap_raw_dealloc, Layout};

use refcount::{ActivePolicy, DomainLock, RefCountPolicy, ReleaseOutcome};
use spin::Once;

use crate::error::ObjectError;
use crate::name::ObjectName;
use crate::object::Object;

/// Allocation entry point: returns storage of at least `size` bytes, or
/// `None` on exhaustion.
pub type AllocFn = fn(size: usize) -> Option<NonNull<u8>>;

/// Matching free entry point: must accept exactly the pointers its
/// [`AllocFn`] returned.
pub type FreeFn = unsafe fn(ptr: NonNull<u8>);

// The default allocator prefixes each allocation with its total size so
// `free` can rebuild the layout from the pointer alone, matching the
// C-style free(ptr) contract the indirection models.
const ALLOC_HEADER: usize = 16;
const ALLOC_ALIGN: usize = 16;

fn heap_alloc(size: usize) -> Option<NonNull<u8>> {
    let total = size.checked_add(ALLOC_HEADER)?;
    let layout = Layout::from_size_align(total, ALLOC_ALIGN).ok()?;
    // SAFETY: `total` is non-zero and the layout is valid.
    let base = NonNull::new(unsafe { heap_raw_alloc(layout) })?;
    unsafe {
        base.cast::<usize>().as_ptr().write(total);
        Some(NonNull::new_unchecked(base.as_ptr().add(ALLOC_HEADER)))
    }
}

unsafe fn heap_free(ptr: NonNull<u8>) {
    let base = ptr.as_ptr().sub(ALLOC_HEADER);
    let total = (base as *const usize).read();
    let layout = Layout::from_size_align_unchecked(total, ALLOC_ALIGN);
    heap_raw_dealloc(base, layout);
}

/// A lock/allocation domain.
///
/// Every object is associated with exactly one registry. The registry's
/// lock is the critical section serializing refcount mutations under the
/// locked strategy: coarse-grained, one lock for every object in the
/// domain. The allocator indirection is opaque: the engine only ever
/// calls through the function pointers and never assumes a strategy.
///
/// Registries live for the life of the process; there is no teardown.
pub struct Registry {
    lock: DomainLock,
    alloc: AllocFn,
    free: FreeFn,
}

impl Registry {
    /// A registry backed by the process heap.
    pub fn new() -> Self {
        Self::with_allocator(heap_alloc, heap_free)
    }

    /// A registry with its own allocation strategy, for isolated domains
    /// such as distinct memory pools.
    pub const fn with_allocator(alloc: AllocFn, free: FreeFn) -> Self {
        Self {
            lock: DomainLock::new(),
            alloc,
            free,
        }
    }

    /// Allocates `size` bytes from this registry's allocator.
    pub fn alloc(&self, size: usize) -> Result<NonNull<u8>, ObjectError> {
        (self.alloc)(size).ok_or(ObjectError::NoMemory)
    }

    /// Returns storage to this registry's allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from this registry's [`alloc`](Self::alloc)
    /// and must not be freed twice or used afterwards.
    pub unsafe fn free(&self, ptr: NonNull<u8>) {
        (self.free)(ptr)
    }

    /// Arms an object: count becomes 1 (the caller's own handle is the
    /// first reference) and the object becomes operable.
    pub fn init(&self, obj: &Object) {
        obj.counter().store(1, Ordering::Release);
        obj.mark_initialized();
    }

    /// Acquires one reference on `obj`.
    ///
    /// Fails with [`ObjectError::NoResource`] if the count is currently
    /// zero: once any release observes the zero transition, no later
    /// acquire on the same object may succeed. A failed acquire is final
    /// for this call; the engine never retries.
    pub fn get<'a>(&self, obj: &'a Object) -> Result<&'a Object, ObjectError> {
        assert!(obj.is_initialized(), "get on uninitialized object");
        if ActivePolicy::try_acquire(obj.counter(), &self.lock) {
            Ok(obj)
        } else {
            Err(ObjectError::NoResource)
        }
    }

    /// Releases one reference on `obj`. No-op if the count is already
    /// zero; never underflows.
    ///
    /// The call that performs the one-to-zero transition invokes the
    /// type's `release` exactly once and then, unless the object is
    /// static, returns its storage through this registry's `free`. The
    /// caller's reference is dead once `put` returns.
    pub fn put(&self, obj: &Object) {
        assert!(obj.is_initialized(), "put on uninitialized object");
        match ActivePolicy::release(obj.counter(), &self.lock) {
            ReleaseOutcome::ReachedZero => self.reap(obj),
            ReleaseOutcome::Remaining | ReleaseOutcome::AlreadyZero => {}
        }
    }

    // Runs on the single winner of the zero transition, outside any
    // critical section.
    fn reap(&self, obj: &Object) {
        log::trace!("object '{}' reached zero references", obj.name());
        (obj.object_type().release)(obj);
        if !obj.is_static() {
            // Non-static objects sit at the start of an allocation from
            // this registry; no reference to the object is live past here.
            unsafe { self.free(NonNull::from(obj).cast()) };
        }
    }

    /// Attaches `obj` under `parent`, naming it.
    ///
    /// The name renders first; an empty format aborts the whole operation
    /// before any hierarchy mutation. A `None` parent attaches a root
    /// object. For a live parent the engine acquires one counted
    /// reference (held by the child until [`del`](Self::del)), links the
    /// edge, then fires the parent's `on_child_attach` before the child's
    /// `on_attach` so parent bookkeeping is current when the child's hook
    /// observes it.
    ///
    /// On any failure `obj` stays unattached; a name already rendered is
    /// kept (name assignment is independent of attachment).
    pub fn add(
        &self,
        obj: &Object,
        parent: Option<&'static Object>,
        name: fmt::Arguments<'_>,
    ) -> Result<(), ObjectError> {
        assert!(obj.is_initialized(), "add on uninitialized object");
        if obj.is_attached() {
            return Err(ObjectError::AlreadyAttached);
        }

        match ObjectName::render(name) {
            Ok(rendered) => obj.store_name(rendered),
            Err(err) => {
                log::warn!("could not set object name: {err}");
                return Err(ObjectError::InvalidName);
            }
        }

        let Some(parent) = parent else {
            if let Some(on_attach) = obj.object_type().on_attach {
                on_attach(obj, None);
            }
            return Ok(());
        };

        // The counted edge from child to parent; a dying parent refuses.
        self.get(parent)?;
        obj.parent_slot()
            .store(parent as *const Object as *mut Object, Ordering::Release);

        if let Some(on_child_attach) = parent.object_type().on_child_attach {
            on_child_attach(parent, obj);
        }
        if let Some(on_attach) = obj.object_type().on_attach {
            on_attach(obj, Some(parent));
        }
        Ok(())
    }

    /// Detaches `obj` from its parent.
    ///
    /// Fires the parent's `on_child_detach`, then releases the reference
    /// the child held on it. The object itself is not destroyed; only
    /// the edge is removed; the object's lifetime is governed solely by
    /// its count.
    pub fn del(&self, obj: &Object) -> Result<(), ObjectError> {
        assert!(obj.is_initialized(), "del on uninitialized object");
        let taken = obj.parent_slot().swap(ptr::null_mut(), Ordering::AcqRel);
        let Some(taken) = NonNull::new(taken) else {
            return Err(ObjectError::NotAttached);
        };
        // Stored from a `&'static Object` in `add`, and the child still
        // holds its counted reference until the `put` below.
        let parent: &Object = unsafe { taken.as_ref() };

        if let Some(on_child_detach) = parent.object_type().on_child_detach {
            on_child_detach(parent, obj);
        }
        self.put(parent);
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

static DEFAULT_REGISTRY: Once<Registry> = Once::new();

/// Constructs the process-wide default registry. Idempotent: the first
/// call builds it, later calls are no-ops. Must run before anything uses
/// [`default_registry`].
pub fn setup() {
    DEFAULT_REGISTRY.call_once(Registry::new);
}

/// The default registry, or [`ObjectError::RegistryNotReady`] if
/// [`setup`] has not run.
pub fn default_registry() -> Result<&'static Registry, ObjectError> {
    DEFAULT_REGISTRY.get().ok_or(ObjectError::RegistryNotReady)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use core::sync::atomic::{AtomicU32, AtomicUsize};

    fn noop_release(_obj: &Object) {}

    static NODE_TYPE: ObjectType = ObjectType {
        name: "node",
        release: noop_release,
        on_attach: None,
        on_child_attach: None,
        on_child_detach: None,
    };

    #[test]
    fn test_init_sets_count_to_one() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        registry.init(&obj);
        assert!(obj.is_initialized());
        assert_eq!(obj.ref_count(), 1);
    }

    #[test]
    fn test_get_put_restores_count() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        registry.init(&obj);

        assert!(registry.get(&obj).is_ok());
        assert_eq!(obj.ref_count(), 2);
        registry.put(&obj);
        assert_eq!(obj.ref_count(), 1);
    }

    #[test]
    fn test_get_fails_at_zero() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        registry.init(&obj);

        registry.put(&obj);
        assert_eq!(obj.ref_count(), 0);
        assert_eq!(registry.get(&obj).unwrap_err(), ObjectError::NoResource);
        assert_eq!(obj.ref_count(), 0);
    }

    #[test]
    fn test_put_never_underflows() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        registry.init(&obj);

        registry.put(&obj);
        registry.put(&obj);
        registry.put(&obj);
        assert_eq!(obj.ref_count(), 0);
    }

    #[test]
    fn test_release_fires_exactly_once_at_zero() {
        static RELEASES: AtomicUsize = AtomicUsize::new(0);
        fn counting_release(_obj: &Object) {
            RELEASES.fetch_add(1, Ordering::Relaxed);
        }
        static COUNTED_TYPE: ObjectType = ObjectType {
            name: "counted",
            release: counting_release,
            on_attach: None,
            on_child_attach: None,
            on_child_detach: None,
        };

        let registry = Registry::new();
        let obj = Object::new_static(&COUNTED_TYPE);
        registry.init(&obj);
        registry.get(&obj).unwrap();

        registry.put(&obj);
        assert_eq!(RELEASES.load(Ordering::Relaxed), 0);
        registry.put(&obj);
        assert_eq!(RELEASES.load(Ordering::Relaxed), 1);
        // Already at zero: no second release.
        registry.put(&obj);
        assert_eq!(RELEASES.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_registry_allocated_object_is_freed_on_zero() {
        static RELEASES: AtomicUsize = AtomicUsize::new(0);
        fn counting_release(_obj: &Object) {
            RELEASES.fetch_add(1, Ordering::Relaxed);
        }
        static HEAP_TYPE: ObjectType = ObjectType {
            name: "heap-node",
            release: counting_release,
            on_attach: None,
            on_child_attach: None,
            on_child_detach: None,
        };

        let registry = Registry::new();
        let storage = registry
            .alloc(core::mem::size_of::<Object>())
            .unwrap()
            .cast::<Object>();
        let obj: &Object = unsafe {
            storage.as_ptr().write(Object::new(&HEAP_TYPE));
            &*storage.as_ptr()
        };
        registry.init(obj);
        assert!(!obj.is_static());

        // Drops the last reference: release fires, storage goes back to
        // the registry allocator.
        registry.put(obj);
        assert_eq!(RELEASES.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_alloc_failure_reports_no_memory() {
        fn exhausted(_size: usize) -> Option<NonNull<u8>> {
            None
        }
        unsafe fn no_free(_ptr: NonNull<u8>) {}
        let registry = Registry::with_allocator(exhausted, no_free);
        assert_eq!(registry.alloc(64), Err(ObjectError::NoMemory));
    }

    #[test]
    fn test_add_names_and_links() {
        static PARENT: Object = Object::new_static(&NODE_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        let child = Object::new_static(&NODE_TYPE);
        registry.init(&child);

        registry
            .add(&child, Some(&PARENT), format_args!("node-{}", 7))
            .unwrap();

        assert_eq!(child.name(), "node-7");
        assert!(child.is_attached());
        assert!(core::ptr::eq(child.parent().unwrap(), &PARENT));
        // add holds one counted reference on the parent.
        assert_eq!(PARENT.ref_count(), 2);
    }

    #[test]
    fn test_add_root_object_has_no_parent() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        registry.init(&obj);

        registry.add(&obj, None, format_args!("root")).unwrap();
        assert_eq!(obj.name(), "root");
        assert!(!obj.is_attached());
    }

    #[test]
    fn test_add_with_empty_name_leaves_object_unattached() {
        static PARENT: Object = Object::new_static(&NODE_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        let child = Object::new_static(&NODE_TYPE);
        registry.init(&child);

        assert_eq!(
            registry.add(&child, Some(&PARENT), format_args!("")),
            Err(ObjectError::InvalidName)
        );
        assert!(!child.is_attached());
        assert_eq!(PARENT.ref_count(), 1);
    }

    #[test]
    fn test_add_to_dying_parent_fails() {
        static PARENT: Object = Object::new_static(&NODE_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        registry.put(&PARENT); // parent reaches zero
        let child = Object::new_static(&NODE_TYPE);
        registry.init(&child);

        assert_eq!(
            registry.add(&child, Some(&PARENT), format_args!("orphan")),
            Err(ObjectError::NoResource)
        );
        assert!(!child.is_attached());
        // The name was rendered before the parent acquire failed and is
        // deliberately kept.
        assert_eq!(child.name(), "orphan");
    }

    #[test]
    fn test_add_twice_is_rejected() {
        static PARENT: Object = Object::new_static(&NODE_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        let child = Object::new_static(&NODE_TYPE);
        registry.init(&child);

        registry
            .add(&child, Some(&PARENT), format_args!("once"))
            .unwrap();
        assert_eq!(
            registry.add(&child, Some(&PARENT), format_args!("twice")),
            Err(ObjectError::AlreadyAttached)
        );
        assert_eq!(PARENT.ref_count(), 2);
    }

    #[test]
    fn test_del_releases_parent_and_clears_edge() {
        static PARENT: Object = Object::new_static(&NODE_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        let child = Object::new_static(&NODE_TYPE);
        registry.init(&child);

        registry
            .add(&child, Some(&PARENT), format_args!("leaf"))
            .unwrap();
        assert_eq!(PARENT.ref_count(), 2);

        registry.del(&child).unwrap();
        assert!(!child.is_attached());
        assert!(child.parent().is_none());
        assert_eq!(PARENT.ref_count(), 1);
    }

    #[test]
    fn test_del_unattached_is_rejected() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        registry.init(&obj);
        assert_eq!(registry.del(&obj), Err(ObjectError::NotAttached));
    }

    #[test]
    fn test_hook_ordering_on_attach() {
        static SEQUENCE: AtomicU32 = AtomicU32::new(0);
        static CHILD_ATTACH_AT: AtomicU32 = AtomicU32::new(u32::MAX);
        static ATTACH_AT: AtomicU32 = AtomicU32::new(u32::MAX);

        fn on_child_attach(parent: &Object, _child: &Object) {
            assert_eq!(parent.object_type().name, "hooked");
            CHILD_ATTACH_AT.store(SEQUENCE.fetch_add(1, Ordering::Relaxed), Ordering::Relaxed);
        }
        fn on_attach(_child: &Object, parent: Option<&Object>) {
            assert!(parent.is_some());
            ATTACH_AT.store(SEQUENCE.fetch_add(1, Ordering::Relaxed), Ordering::Relaxed);
        }
        static HOOKED_TYPE: ObjectType = ObjectType {
            name: "hooked",
            release: noop_release,
            on_attach: Some(on_attach),
            on_child_attach: Some(on_child_attach),
            on_child_detach: None,
        };

        static PARENT: Object = Object::new_static(&HOOKED_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        let child = Object::new_static(&HOOKED_TYPE);
        registry.init(&child);

        registry
            .add(&child, Some(&PARENT), format_args!("ordered"))
            .unwrap();

        // Parent bookkeeping runs before the child's own hook.
        assert!(
            CHILD_ATTACH_AT.load(Ordering::Relaxed) < ATTACH_AT.load(Ordering::Relaxed),
            "on_child_attach must run before on_attach"
        );
    }

    #[test]
    fn test_detach_hook_fires() {
        static DETACHES: AtomicUsize = AtomicUsize::new(0);
        fn on_child_detach(_parent: &Object, _child: &Object) {
            DETACHES.fetch_add(1, Ordering::Relaxed);
        }
        static WATCHER_TYPE: ObjectType = ObjectType {
            name: "watcher",
            release: noop_release,
            on_attach: None,
            on_child_attach: None,
            on_child_detach: Some(on_child_detach),
        };

        static PARENT: Object = Object::new_static(&WATCHER_TYPE);
        let registry = Registry::new();
        registry.init(&PARENT);
        let child = Object::new_static(&NODE_TYPE);
        registry.init(&child);

        registry
            .add(&child, Some(&PARENT), format_args!("watched"))
            .unwrap();
        registry.del(&child).unwrap();
        assert_eq!(DETACHES.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_setup_is_idempotent() {
        setup();
        let first = default_registry().unwrap() as *const Registry;
        setup();
        let second = default_registry().unwrap() as *const Registry;
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "get on uninitialized object")]
    fn test_get_on_uninitialized_object_panics() {
        let registry = Registry::new();
        let obj = Object::new_static(&NODE_TYPE);
        let _ = registry.get(&obj);
    }
}
