// queued_pool.rs - Deferred structural mutation for a component pool
//
// Creates and destroys are recorded as intents and applied together at
// `flush`, the only point where the pool's membership changes. Iteration
// over a window can therefore queue work for later without ever seeing a
// half-mutated pool. A flush either applies every intent or none of them.

use crate::ecs::{
    CreationQueue, DestructionQueue, Entity, EntityEvent, PendingOp, PoolError, View, ViewMut,
    Window,
};
use crate::pool::{occupied_error, ComponentPool};
use tracing::{debug, warn};

type Spawner<T> = Box<dyn FnMut(Entity) -> T + Send>;

fn default_component<T: Default>(_: Entity) -> T {
    T::default()
}

/// What a flush applied.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct FlushReport {
    pub created: usize,
    pub destroyed: usize,
}

impl FlushReport {
    /// True when the flush changed the pool's membership.
    pub fn is_structural(&self) -> bool {
        self.created + self.destroyed > 0
    }
}

/// A pool bundled with its creation and destruction queues.
pub struct QueuedPool<P: ComponentPool> {
    pool: P,
    creation: CreationQueue<P::Component>,
    destruction: DestructionQueue,
    spawner: Option<Spawner<P::Component>>,
}

impl<P: ComponentPool> QueuedPool<P> {
    pub fn new(pool: P) -> Self {
        Self {
            pool,
            creation: CreationQueue::new(),
            destruction: DestructionQueue::new(),
            spawner: None,
        }
    }

    /// Queue a component built by `make` for every entity that
    /// [`observe`](Self::observe) sees created.
    pub fn auto_create<F>(mut self, make: F) -> Self
    where
        F: FnMut(Entity) -> P::Component + Send + 'static,
    {
        self.spawner = Some(Box::new(make));
        self
    }

    /// [`auto_create`](Self::auto_create) with the component's default value.
    pub fn auto_create_default(self) -> Self
    where
        P::Component: Default + 'static,
    {
        self.auto_create(default_component::<P::Component>)
    }

    /// Follow allocator lifecycle events, as drained from an
    /// [`EntityPool`](crate::ecs::EntityPool).
    ///
    /// A destroyed entity has its pending creation withdrawn, or its live
    /// component queued for destruction. A created entity gets a component
    /// queued when auto-creation is on. Nothing applies before `flush`.
    pub fn observe<'e, I>(&mut self, events: I) -> Result<(), PoolError>
    where
        I: IntoIterator<Item = &'e EntityEvent>,
    {
        for event in events {
            match *event {
                EntityEvent::Destroyed(entity) => {
                    if self.creation.cancel(entity).is_none()
                        && self.pool.has(entity)
                        && !self.destruction.contains(entity)
                    {
                        self.destruction.enqueue(entity)?;
                    }
                }
                EntityEvent::Created(entity) => {
                    let Some(make) = self.spawner.as_mut() else {
                        continue;
                    };
                    if self.creation.contains(entity) || self.pool.has(entity) {
                        continue;
                    }
                    let value = make(entity);
                    Staging {
                        pool: &self.pool,
                        creation: &mut self.creation,
                        destruction: &mut self.destruction,
                    }
                    .create(entity, value)?;
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn pool(&self) -> &P {
        &self.pool
    }

    pub fn get(&self, entity: Entity) -> Result<&P::Component, PoolError> {
        self.pool.get(entity)
    }

    /// In-place update; membership is untouched so windows stay valid.
    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut P::Component, PoolError> {
        self.pool.get_mut(entity)
    }

    /// Live in the pool right now. Pending intents are not considered.
    pub fn has(&self, entity: Entity) -> bool {
        self.pool.has(entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.pool.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pool.is_empty()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.pool.count()
    }

    pub fn pending_creations(&self) -> usize {
        self.creation.len()
    }

    pub fn pending_destructions(&self) -> usize {
        self.destruction.len()
    }

    /// Queue a creation. See [`Staging::create`].
    pub fn create(&mut self, entity: Entity, value: P::Component) -> Result<(), PoolError> {
        self.staging().create(entity, value)
    }

    /// Queue a destruction. See [`Staging::destroy`].
    pub fn destroy(&mut self, entity: Entity) -> Result<(), PoolError> {
        self.staging().destroy(entity)
    }

    pub fn staging(&mut self) -> Staging<'_, P> {
        self.split().1
    }

    /// Borrow the pool for reading and the queues for writing at once.
    ///
    /// ```ignore
    /// let (pool, mut staging) = queued.split();
    /// for (entity, hp) in pool.iter() {
    ///     if *hp <= 0 {
    ///         staging.destroy(entity)?;
    ///     }
    /// }
    /// ```
    pub fn split(&mut self) -> (&P, Staging<'_, P>) {
        let staging = Staging {
            pool: &self.pool,
            creation: &mut self.creation,
            destruction: &mut self.destruction,
        };
        (&self.pool, staging)
    }

    /// Apply every pending intent: destructions first, then creations, each
    /// in the order they were queued.
    ///
    /// The whole batch is checked before anything applies. On error the pool
    /// is untouched, the rejected entry is dropped, and every other entry
    /// stays queued for the next flush.
    pub fn flush(&mut self) -> Result<FlushReport, PoolError> {
        if let Some((entity, op, err)) = self.first_rejection() {
            match op {
                PendingOp::Destroy => {
                    self.destruction.cancel(entity);
                }
                PendingOp::Create => {
                    self.creation.cancel(entity);
                }
            }
            warn!(?entity, ?op, %err, "flush rejected a queued intent");
            return Err(err);
        }
        let destroyed = self.destruction.flush_into(&mut self.pool)?;
        let created = self.creation.flush_into(&mut self.pool)?;
        let report = FlushReport { created, destroyed };
        debug!(
            created,
            destroyed,
            live = self.pool.len(),
            "flushed component pool"
        );
        Ok(report)
    }

    /// First queued intent that would fail against the pool as the flush
    /// will leave it.
    fn first_rejection(&self) -> Option<(Entity, PendingOp, PoolError)> {
        for entity in self.destruction.pending() {
            if !self.pool.has(entity) {
                return Some((entity, PendingOp::Destroy, PoolError::MissingEntity { entity }));
            }
        }
        self.creation.pending().find_map(|entity| match self.pool.occupant(entity) {
            Some(occupant) if !self.destruction.contains(occupant) => Some((
                entity,
                PendingOp::Create,
                occupied_error(entity, occupant),
            )),
            _ => None,
        })
    }

    /// Empty the pool and discard both queues.
    pub fn clear(&mut self) {
        debug!(
            dropped = self.pool.len(),
            discarded = self.creation.len() + self.destruction.len(),
            "cleared component pool"
        );
        self.pool.clear();
        self.clear_queues();
    }

    /// Discard pending intents, leaving the pool untouched.
    pub fn clear_queues(&mut self) {
        self.creation.clear();
        self.destruction.clear();
    }

    pub fn window(&self) -> Window {
        self.pool.window()
    }

    pub fn view(&self, window: &Window) -> Result<View<'_, P>, PoolError> {
        window.bind(&self.pool)
    }

    pub fn view_mut(&mut self, window: &Window) -> Result<ViewMut<'_, P>, PoolError> {
        window.bind_mut(&mut self.pool)
    }

    /// Drop the queues and hand back the pool.
    pub fn into_inner(self) -> P {
        self.pool
    }
}

impl<P: ComponentPool + Default> Default for QueuedPool<P> {
    fn default() -> Self {
        Self::new(P::default())
    }
}

/// Enqueue handle validated against the pool's current contents.
pub struct Staging<'a, P: ComponentPool> {
    pool: &'a P,
    creation: &'a mut CreationQueue<P::Component>,
    destruction: &'a mut DestructionQueue,
}

impl<'a, P: ComponentPool> Staging<'a, P> {
    /// Queue `value` for `entity`.
    ///
    /// Rejected with `ConflictingQueueState` when `entity` is pending
    /// destruction, and with `DuplicateCreate` when it is live or already
    /// pending creation. An older generation still holding the index is
    /// fine only if its destruction is queued; another generation already
    /// pending creation at the index is `IndexOccupied`.
    pub fn create(&mut self, entity: Entity, value: P::Component) -> Result<(), PoolError> {
        if self.destruction.contains(entity) {
            return Err(PoolError::ConflictingQueueState {
                entity,
                pending: PendingOp::Destroy,
            });
        }
        if self.creation.contains(entity) {
            return Err(PoolError::DuplicateCreate { entity });
        }
        match self.pool.occupant(entity) {
            Some(occupant) if occupant == entity => {
                return Err(PoolError::DuplicateCreate { entity });
            }
            Some(occupant) if !self.destruction.contains(occupant) => {
                return Err(PoolError::IndexOccupied { entity, occupant });
            }
            _ => {}
        }
        self.creation.enqueue(entity, value)
    }

    /// Queue removal of `entity`'s component.
    ///
    /// Rejected with `ConflictingQueueState` when `entity` is pending
    /// creation, and with `MissingEntity` when it is not live or its
    /// destruction is already queued.
    pub fn destroy(&mut self, entity: Entity) -> Result<(), PoolError> {
        if self.creation.contains(entity) {
            return Err(PoolError::ConflictingQueueState {
                entity,
                pending: PendingOp::Create,
            });
        }
        if !self.pool.has(entity) {
            return Err(PoolError::MissingEntity { entity });
        }
        self.destruction.enqueue(entity)
    }

    pub fn is_pending_create(&self, entity: Entity) -> bool {
        self.creation.contains(entity)
    }

    pub fn is_pending_destroy(&self, entity: Entity) -> bool {
        self.destruction.contains(entity)
    }
}
