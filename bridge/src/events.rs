//! Host event catalog
//!
//! The typed surface the host adapter maps its events through before they
//! enter the outbound pipeline. Each variant knows its wire name and how
//! to coerce its fields into the string argument vector the companion
//! receives.

/// One host-originated event.
#[derive(Clone, Debug, PartialEq)]
pub enum HostEvent {
    PlayerJoin { player: String },
    PlayerQuit { player: String },
    PlayerDeath { player: String, death_message: String },
    PlayerRespawn { player: String },
    PlayerMove { player: String },
    PlayerInteract { player: String, action: String, item: String },
    PlayerDropItem { player: String, item: String },
    PlayerPickupItem { player: String, item: String },
    BlockBreak { player: String, block: String },
    BlockPlace { player: String, block: String },
    BlockIgnite { player: String, block: String },
    EntitySpawn { entity_type: String },
    EntityDamage { entity: String, damage: f64 },
    EntityDeath { entity: String },
    InventoryOpen { player: String },
    InventoryClose { player: String },
    InventoryClick { player: String, slot: i32, item: String },
    ServerCommand { sender: String, command: String },
    WorldLoad { world: String },
    WeatherChange { world: String, storm: bool },
}

impl HostEvent {
    /// Wire name of this event.
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::PlayerJoin { .. } => "PlayerJoin",
            HostEvent::PlayerQuit { .. } => "PlayerQuit",
            HostEvent::PlayerDeath { .. } => "PlayerDeath",
            HostEvent::PlayerRespawn { .. } => "PlayerRespawn",
            HostEvent::PlayerMove { .. } => "PlayerMove",
            HostEvent::PlayerInteract { .. } => "PlayerInteract",
            HostEvent::PlayerDropItem { .. } => "PlayerDropItem",
            HostEvent::PlayerPickupItem { .. } => "PlayerPickupItem",
            HostEvent::BlockBreak { .. } => "BlockBreak",
            HostEvent::BlockPlace { .. } => "BlockPlace",
            HostEvent::BlockIgnite { .. } => "BlockIgnite",
            HostEvent::EntitySpawn { .. } => "EntitySpawn",
            HostEvent::EntityDamage { .. } => "EntityDamage",
            HostEvent::EntityDeath { .. } => "EntityDeath",
            HostEvent::InventoryOpen { .. } => "InventoryOpen",
            HostEvent::InventoryClose { .. } => "InventoryClose",
            HostEvent::InventoryClick { .. } => "InventoryClick",
            HostEvent::ServerCommand { .. } => "ServerCommand",
            HostEvent::WorldLoad { .. } => "WorldLoad",
            HostEvent::WeatherChange { .. } => "WeatherChange",
        }
    }

    /// String-coerced arguments, in wire order.
    pub fn args(&self) -> Vec<String> {
        match self {
            HostEvent::PlayerJoin { player }
            | HostEvent::PlayerQuit { player }
            | HostEvent::PlayerRespawn { player }
            | HostEvent::PlayerMove { player }
            | HostEvent::InventoryOpen { player }
            | HostEvent::InventoryClose { player } => vec![player.clone()],
            HostEvent::PlayerDeath {
                player,
                death_message,
            } => vec![player.clone(), death_message.clone()],
            HostEvent::PlayerInteract {
                player,
                action,
                item,
            } => vec![player.clone(), action.clone(), item.clone()],
            HostEvent::PlayerDropItem { player, item }
            | HostEvent::PlayerPickupItem { player, item } => {
                vec![player.clone(), item.clone()]
            }
            HostEvent::BlockBreak { player, block }
            | HostEvent::BlockPlace { player, block }
            | HostEvent::BlockIgnite { player, block } => {
                vec![player.clone(), block.clone()]
            }
            HostEvent::EntitySpawn { entity_type } => vec![entity_type.clone()],
            HostEvent::EntityDamage { entity, damage } => {
                vec![entity.clone(), damage.to_string()]
            }
            HostEvent::EntityDeath { entity } => vec![entity.clone()],
            HostEvent::InventoryClick { player, slot, item } => {
                vec![player.clone(), slot.to_string(), item.clone()]
            }
            HostEvent::ServerCommand { sender, command } => {
                vec![sender.clone(), command.clone()]
            }
            HostEvent::WorldLoad { world } => vec![world.clone()],
            HostEvent::WeatherChange { world, storm } => {
                vec![world.clone(), storm.to_string()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_and_args_line_up() {
        let event = HostEvent::BlockBreak {
            player: "Alice".to_string(),
            block: "STONE".to_string(),
        };
        assert_eq!(event.name(), "BlockBreak");
        assert_eq!(event.args(), vec!["Alice", "STONE"]);

        let event = HostEvent::InventoryClick {
            player: "Bob".to_string(),
            slot: 7,
            item: "AIR".to_string(),
        };
        assert_eq!(event.args(), vec!["Bob", "7", "AIR"]);

        let event = HostEvent::WeatherChange {
            world: "overworld".to_string(),
            storm: true,
        };
        assert_eq!(event.args(), vec!["overworld", "true"]);
    }

    #[test]
    fn damage_is_string_coerced() {
        let event = HostEvent::EntityDamage {
            entity: "Zombie".to_string(),
            damage: 4.5,
        };
        assert_eq!(event.args(), vec!["Zombie", "4.5"]);
    }
}
