// src/common/locks.rs

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Um mutex por id de entidade (agendamento ou comanda).
///
/// Operações concorrentes sobre o mesmo id ficam em fila; ids diferentes
/// não se bloqueiam. Entradas ociosas são removidas quando o último guard cai.
#[derive(Clone, Default)]
pub struct EntityLocks {
    slots: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
}

pub struct EntityGuard {
    id: Uuid,
    slots: Arc<DashMap<Uuid, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl EntityLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, id: Uuid) -> EntityGuard {
        // O clone do Arc acontece com o shard travado, então o `remove_if`
        // do Drop nunca remove um slot que alguém está esperando.
        let slot = self
            .slots
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let guard = slot.lock_owned().await;
        EntityGuard {
            id,
            slots: self.slots.clone(),
            guard: Some(guard),
        }
    }

    /// Quantos ids têm lock alocado (usado nos testes).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // Solta o mutex primeiro; o guard ainda segura um Arc do slot.
        drop(self.guard.take());
        self.slots
            .remove_if(&self.id, |_, slot| Arc::strong_count(slot) == 1);
    }
}
