//! The atom registry.
//!
//! Atoms are interned (id, name) pairs labeling typed properties exchanged
//! with the window system. The registry is a process-wide two-way cache:
//! within one process there is at most one canonical [`Atom`] instance per
//! non-zero id and at most one per non-empty name, and the registry is the
//! sole authority minting them. Instances live for the life of the process;
//! there is no eviction.
//!
//! Every native round trip — interning, name lookup, property access — is
//! serialized by the display lock, acquired immediately before and released
//! immediately after each call. Code holding the tree lock may take the
//! display lock; nothing here ever calls back into the tree, which fixes the
//! lock order.

use crate::backend::Connection;
use crate::component::NativeHandle;
use crate::error::Error;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Predefined atom id for the CARDINAL property type.
pub const XA_CARDINAL: u32 = 6;

/// An interned atom.
///
/// `id` is the platform-assigned identifier; zero means the atom is
/// local-only and has not been interned. The name of an atom obtained by id
/// is resolved lazily on first request and cached on the instance.
#[derive(Debug)]
pub struct Atom {
    id: u32,
    name: Mutex<Option<String>>,
}

impl Atom {
    fn new(id: u32, name: Option<String>) -> Atom {
        Atom {
            id,
            name: Mutex::new(name),
        }
    }

    /// The platform id, or zero if unresolved.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the atom has a platform id.
    pub fn is_resolved(&self) -> bool {
        self.id != 0
    }

    /// The name, if it is already known locally (no round trip).
    pub fn cached_name(&self) -> Option<String> {
        self.name.lock().clone()
    }
}

pub(crate) struct DisplayInner<C> {
    pub(crate) conn: C,
    by_id: HashMap<u32, Arc<Atom>>,
    by_name: HashMap<String, Arc<Atom>>,
}

impl<C> DisplayInner<C> {
    fn register(&mut self, atom: &Arc<Atom>) {
        if atom.id != 0 {
            self.by_id.insert(atom.id, Arc::clone(atom));
        }
        if let Some(name) = atom.cached_name() {
            if !name.is_empty() {
                self.by_name.insert(name.clone(), Arc::clone(atom));
            }
        }
        debug!("registered atom {:?} {}", atom.cached_name(), atom.id);
    }

    fn canonical_by_id(&mut self, id: u32) -> Arc<Atom> {
        if let Some(atom) = self.by_id.get(&id) {
            return Arc::clone(atom);
        }
        let atom = Arc::new(Atom::new(id, None));
        self.register(&atom);
        atom
    }
}

/// The display connection plus the atom registry, behind the display lock.
pub struct Display<C: Connection> {
    pub(crate) inner: Mutex<DisplayInner<C>>,
}

impl<C: Connection> Display<C> {
    /// Wraps a connection.
    pub fn new(conn: C) -> Display<C> {
        Display {
            inner: Mutex::new(DisplayInner {
                conn,
                by_id: HashMap::new(),
                by_name: HashMap::new(),
            }),
        }
    }

    /// Returns the canonical atom for an id, minting an id-only instance on
    /// cache miss. The name stays empty until first requested.
    pub fn atom_by_id(&self, id: u32) -> Arc<Atom> {
        let mut inner = self.inner.lock();
        if id == 0 {
            // no canonical instance for the unresolved id
            return Arc::new(Atom::new(0, None));
        }
        inner.canonical_by_id(id)
    }

    /// Returns the canonical atom for a name, interning it through the
    /// platform on cache miss.
    pub fn atom_by_name(&self, name: &str) -> Result<Arc<Atom>, Error<C::Error>> {
        let mut inner = self.inner.lock();
        if let Some(atom) = inner.by_name.get(name) {
            return Ok(Arc::clone(atom));
        }
        let id = inner.conn.intern_atom(name).map_err(Error::Native)?;
        let atom = Arc::new(Atom::new(id, Some(name.to_owned())));
        inner.register(&atom);
        Ok(atom)
    }

    /// Returns the canonical atom for a name without interning it; the
    /// result is unresolved until the platform assigns an id some other way.
    pub fn local_atom(&self, name: &str) -> Arc<Atom> {
        let mut inner = self.inner.lock();
        if let Some(atom) = inner.by_name.get(name) {
            return Arc::clone(atom);
        }
        let atom = Arc::new(Atom::new(0, Some(name.to_owned())));
        inner.register(&atom);
        atom
    }

    /// Resolves the name of an atom, lazily.
    ///
    /// Atoms obtained by name answer from the instance cache; atoms obtained
    /// by id pay one round trip on the first call and are pure reads after.
    pub fn name_of(&self, atom: &Arc<Atom>) -> Result<String, Error<C::Error>> {
        if let Some(name) = atom.cached_name() {
            return Ok(name);
        }
        let mut inner = self.inner.lock();
        let name = inner.conn.atom_name(atom.id).map_err(Error::Native)?;
        *atom.name.lock() = Some(name.clone());
        if !name.is_empty() {
            inner.by_name.insert(name.clone(), Arc::clone(atom));
        }
        Ok(name)
    }

    /// Replaces a string property on a native window.
    pub fn set_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
        value: &str,
    ) -> Result<(), Error<C::Error>> {
        resolved(atom)?;
        let mut inner = self.inner.lock();
        inner
            .conn
            .set_property(window, atom.id, value.as_bytes())
            .map_err(Error::Native)
    }

    /// Reads a string property from a native window.
    pub fn get_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
    ) -> Result<String, Error<C::Error>> {
        resolved(atom)?;
        let mut inner = self.inner.lock();
        let bytes = inner
            .conn
            .get_property(window, atom.id)
            .map_err(Error::Native)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replaces a property with a single 32-bit cardinal.
    pub fn set_card32_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
        value: u32,
    ) -> Result<(), Error<C::Error>> {
        resolved(atom)?;
        let mut inner = self.inner.lock();
        inner
            .conn
            .set_card32_property(window, atom.id, value)
            .map_err(Error::Native)
    }

    /// Reads a single 32-bit cardinal property.
    pub fn get_card32_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
    ) -> Result<u32, Error<C::Error>> {
        resolved(atom)?;
        let mut inner = self.inner.lock();
        inner
            .conn
            .get_card32_property(window, atom.id)
            .map_err(Error::Native)
    }

    /// Deletes a property.
    pub fn delete_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
    ) -> Result<(), Error<C::Error>> {
        resolved(atom)?;
        let mut inner = self.inner.lock();
        inner
            .conn
            .delete_property(window, atom.id)
            .map_err(Error::Native)
    }

    /// Replaces a property with an ordered list of atoms. Every atom in the
    /// list must be resolved.
    pub fn set_atom_list_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
        values: &[Arc<Atom>],
    ) -> Result<(), Error<C::Error>> {
        resolved(atom)?;
        let mut ids = Vec::with_capacity(values.len());
        for value in values {
            resolved(value)?;
            ids.push(value.id);
        }
        let mut inner = self.inner.lock();
        inner
            .conn
            .set_atom_list_property(window, atom.id, &ids)
            .map_err(Error::Native)
    }

    /// Reads a property as an ordered list of canonical atoms.
    pub fn get_atom_list_property(
        &self,
        window: NativeHandle,
        atom: &Atom,
    ) -> Result<Vec<Arc<Atom>>, Error<C::Error>> {
        resolved(atom)?;
        let mut inner = self.inner.lock();
        let ids = inner
            .conn
            .get_atom_list_property(window, atom.id)
            .map_err(Error::Native)?;
        Ok(ids.into_iter().map(|id| inner.canonical_by_id(id)).collect())
    }
}

fn resolved<E>(atom: &Atom) -> Result<(), Error<E>> {
    if atom.is_resolved() {
        Ok(())
    } else {
        Err(Error::UnresolvedAtom)
    }
}
