use async_trait::async_trait;

use pd_core::{AgentId, Direction, Position};
use pd_executor::{EnvironmentGateway, OccupancyProbe};

use crate::World;

/// One connected agent's view of a [`World`].
#[derive(Clone)]
pub struct WorldGateway {
    world: World,
    id:    AgentId,
}

impl WorldGateway {
    pub(crate) fn new(world: World, id: AgentId) -> Self {
        Self { world, id }
    }

    pub fn id(&self) -> &AgentId {
        &self.id
    }
}

#[async_trait]
impl EnvironmentGateway for WorldGateway {
    async fn move_to(&self, dir: Direction) -> bool {
        tokio::time::sleep(self.world.movement_duration()).await;
        self.world.state().lock().await.apply_move(&self.id, dir)
    }

    async fn pickup(&self) -> bool {
        self.world.state().lock().await.apply_pickup(&self.id)
    }

    async fn putdown(&self) -> bool {
        self.world.state().lock().await.apply_putdown(&self.id)
    }

    async fn say(&self, to: &AgentId, payload: String) {
        self.world.state().lock().await.relay(&self.id, to, payload);
    }
}

#[async_trait]
impl OccupancyProbe for WorldGateway {
    async fn is_occupied(&self, pos: Position) -> bool {
        self.world.occupied_for(&self.id, pos).await
    }
}
