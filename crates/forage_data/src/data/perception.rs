use serde::{Deserialize, Serialize};

/// One of the four boundary walls of a walled arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WallSide {
    North,
    South,
    East,
    West,
}

impl WallSide {
    pub const ALL: [WallSide; 4] = [
        WallSide::North,
        WallSide::South,
        WallSide::East,
        WallSide::West,
    ];

    /// Position of the wall in the one-hot channel stack.
    pub fn channel(self) -> usize {
        match self {
            WallSide::North => 0,
            WallSide::South => 1,
            WallSide::East => 2,
            WallSide::West => 3,
        }
    }
}

/// Discrete result of resolving one perception ray.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RayLabel {
    /// Nothing within range along this ray.
    #[default]
    Nothing,
    Wall(WallSide),
    Landmark,
    /// Another agent that is exploring or colliding.
    AgentExplore,
    /// Another agent that is currently exploiting a patch.
    AgentExploit,
}

/// Channel arrangement of the one-hot visual encoding.
///
/// | layout            | channels                                           |
/// |-------------------|----------------------------------------------------|
/// | `Walls`           | north, south, east, west                           |
/// | `Agents`          | agent_explore, agent_exploit                       |
/// | `WallsAndAgents`  | north, south, east, west, agent_explore, agent_exploit |
///
/// Landmarks have a label of their own but no channel, so a landmark ray
/// encodes as an all-zero column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelLayout {
    Walls,
    Agents,
    WallsAndAgents,
}

impl ChannelLayout {
    pub fn channel_count(self) -> usize {
        match self {
            ChannelLayout::Walls => 4,
            ChannelLayout::Agents => 2,
            ChannelLayout::WallsAndAgents => 6,
        }
    }

    /// Channel index that a label lights up, if any.
    pub fn channel_of(self, label: RayLabel) -> Option<usize> {
        match (self, label) {
            (ChannelLayout::Walls | ChannelLayout::WallsAndAgents, RayLabel::Wall(side)) => {
                Some(side.channel())
            }
            (ChannelLayout::Agents, RayLabel::AgentExplore) => Some(0),
            (ChannelLayout::Agents, RayLabel::AgentExploit) => Some(1),
            (ChannelLayout::WallsAndAgents, RayLabel::AgentExplore) => Some(4),
            (ChannelLayout::WallsAndAgents, RayLabel::AgentExploit) => Some(5),
            _ => None,
        }
    }
}
