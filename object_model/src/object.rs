//! Objects and their static type descriptors

use core::fmt;
use core::ptr;
use core::sync::atomic::{AtomicPtr, AtomicU8, Ordering};

use refcount::RefCount;
use spin::Mutex;

use crate::name::ObjectName;

const FLAG_INITIALIZED: u8 = 1 << 0;
const FLAG_STATIC: u8 = 1 << 1;
const FLAG_READONLY: u8 = 1 << 2;

/// Static descriptor shared by every object of one class.
///
/// Descriptors are immutable, never reference-counted, and must outlive
/// every object referencing them; the `&'static` lifetime enforces that.
/// `release` is mandatory and fires exactly once when an object's count
/// reaches zero. The three hooks are optional (absent means no-op).
pub struct ObjectType {
    /// Class name, for diagnostics.
    pub name: &'static str,
    /// Called on the winner of the one-to-zero transition, outside any
    /// critical section.
    pub release: fn(&Object),
    /// Invoked on the child after it is linked to its parent.
    pub on_attach: Option<fn(child: &Object, parent: Option<&Object>)>,
    /// Invoked on the parent after a child is linked to it.
    pub on_child_attach: Option<fn(parent: &Object, child: &Object)>,
    /// Invoked on the parent after a child is unlinked from it.
    pub on_child_detach: Option<fn(parent: &Object, child: &Object)>,
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectType").field("name", &self.name).finish()
    }
}

/// A reference-counted unit of shared state.
///
/// Objects are const-constructible so they can live in statics; a fresh
/// object is inert (count zero, uninitialized) until armed by
/// [`Registry::init`](crate::Registry::init). Non-static objects must be
/// placed at the start of an allocation obtained from their registry,
/// because the engine returns that same address to the registry's `free`
/// once the count reaches zero.
///
/// Parents attached via [`Registry::add`](crate::Registry::add) are
/// `&'static`, which is what makes the stored parent pointer sound to
/// dereference for as long as the edge exists.
pub struct Object {
    ref_count: RefCount,
    parent: AtomicPtr<Object>,
    object_type: &'static ObjectType,
    flags: AtomicU8,
    name: Mutex<ObjectName>,
}

impl Object {
    /// A heap-placed object: freed through its registry at zero count.
    pub const fn new(object_type: &'static ObjectType) -> Self {
        Self::with_flags(object_type, 0)
    }

    /// A statically-placed object: never handed to the registry's `free`.
    pub const fn new_static(object_type: &'static ObjectType) -> Self {
        Self::with_flags(object_type, FLAG_STATIC)
    }

    /// A read-only object: attribute mutation is rejected.
    pub const fn new_readonly(object_type: &'static ObjectType) -> Self {
        Self::with_flags(object_type, FLAG_READONLY)
    }

    /// A statically-placed, read-only object.
    pub const fn new_static_readonly(object_type: &'static ObjectType) -> Self {
        Self::with_flags(object_type, FLAG_STATIC | FLAG_READONLY)
    }

    const fn with_flags(object_type: &'static ObjectType, flags: u8) -> Self {
        Self {
            ref_count: RefCount::new(0),
            parent: AtomicPtr::new(ptr::null_mut()),
            object_type,
            flags: AtomicU8::new(flags),
            name: Mutex::new(ObjectName::empty()),
        }
    }

    pub fn object_type(&self) -> &'static ObjectType {
        self.object_type
    }

    /// Snapshot of the object's name.
    pub fn name(&self) -> ObjectName {
        *self.name.lock()
    }

    pub fn is_initialized(&self) -> bool {
        self.flags.load(Ordering::Acquire) & FLAG_INITIALIZED != 0
    }

    pub fn is_static(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & FLAG_STATIC != 0
    }

    pub fn is_readonly(&self) -> bool {
        self.flags.load(Ordering::Relaxed) & FLAG_READONLY != 0
    }

    pub fn is_attached(&self) -> bool {
        !self.parent.load(Ordering::Acquire).is_null()
    }

    /// The attached parent, if any.
    pub fn parent(&self) -> Option<&'static Object> {
        let ptr = self.parent.load(Ordering::Acquire);
        // Stored from a `&'static Object` in `Registry::add`.
        (!ptr.is_null()).then(|| unsafe { &*ptr })
    }

    /// Diagnostic snapshot of the reference count. Racy by nature; callers
    /// must not base lifetime decisions on it.
    pub fn ref_count(&self) -> u32 {
        self.ref_count.load(Ordering::Relaxed)
    }

    pub(crate) fn counter(&self) -> &RefCount {
        &self.ref_count
    }

    pub(crate) fn parent_slot(&self) -> &AtomicPtr<Object> {
        &self.parent
    }

    pub(crate) fn mark_initialized(&self) {
        self.flags.fetch_or(FLAG_INITIALIZED, Ordering::Release);
    }

    pub(crate) fn store_name(&self, name: ObjectName) {
        *self.name.lock() = name;
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("name", &self.name())
            .field("type", &self.object_type.name)
            .field("ref_count", &self.ref_count())
            .field("attached", &self.is_attached())
            .finish()
    }
}
