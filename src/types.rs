use cgmath::{Vector3, Zero};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::utils;

/////////////////////////////////////////////////////////////////////////////////////////////////

pub type Index = usize;
pub type Position = Vector3<f64>;

/// Name given to every End Site leaf.
pub const END_SITE_NAME: &str = "End Site";

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    X,
    Y,
    Z,
}

/// One animated degree of freedom declared in a `CHANNELS` line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Channel {
    Xposition,
    Yposition,
    Zposition,
    Xrotation,
    Yrotation,
    Zrotation,
    /// Any non-standard channel name, kept verbatim.
    Other(String),
}

impl Channel {
    pub fn from_name(name: &str) -> Channel {
        match name {
            "Xposition" => Channel::Xposition,
            "Yposition" => Channel::Yposition,
            "Zposition" => Channel::Zposition,
            "Xrotation" => Channel::Xrotation,
            "Yrotation" => Channel::Yrotation,
            "Zrotation" => Channel::Zrotation,
            other => Channel::Other(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Channel::Xposition => "Xposition",
            Channel::Yposition => "Yposition",
            Channel::Zposition => "Zposition",
            Channel::Xrotation => "Xrotation",
            Channel::Yrotation => "Yrotation",
            Channel::Zrotation => "Zrotation",
            Channel::Other(name) => name,
        }
    }

    pub fn is_position(&self) -> bool {
        matches!(self, Channel::Xposition | Channel::Yposition | Channel::Zposition)
    }

    pub fn is_rotation(&self) -> bool {
        matches!(self, Channel::Xrotation | Channel::Yrotation | Channel::Zrotation)
    }

    /// Axis of a standard channel; `None` for [`Channel::Other`].
    pub fn axis(&self) -> Option<Axis> {
        match self {
            Channel::Xposition | Channel::Xrotation => Some(Axis::X),
            Channel::Yposition | Channel::Yrotation => Some(Axis::Y),
            Channel::Zposition | Channel::Zrotation => Some(Axis::Z),
            Channel::Other(_) => None,
        }
    }
}

/// Channel values of one joint at one point in time.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    pub time: f64,
    /// One value per declared channel, in declaration order.
    pub values: Vec<f64>,
}

/////////////////////////////////////////////////////////////////////////////////////////////////

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Joint {
    pub name: String,
    pub index: Index,
    /// `None` for roots. Only a lookup handle, the parent owns this joint through `children`.
    pub parent: Option<Index>,
    pub depth: usize,
    pub offset: Position,
    /// Empty for End Site leaves.
    pub channels: Vec<Channel>,
    /// Children in document order.
    pub children: Vec<Index>,
    pub animation: Vec<Frame>,
}

impl Joint {
    pub fn is_end_site(&self) -> bool {
        self.channels.is_empty() && self.children.is_empty() && self.name == END_SITE_NAME
    }
}

/// The joint forest: every joint of every `ROOT` tree, stored in document order.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Skeleton {
    pub(crate) joints: Vec<Joint>,
    pub(crate) roots: Vec<Index>,
}

impl Skeleton {
    /// Add a joint as the last child of `parent` (or as a new root) and return its index.
    pub(crate) fn push_joint(
        &mut self,
        name: String,
        offset: Position,
        channels: Vec<Channel>,
        parent: Option<Index>,
    ) -> Index {
        let index = self.joints.len();
        let depth = match parent {
            Some(parent) => {
                self.joints[parent].children.push(index);
                self.joints[parent].depth + 1
            }
            None => {
                self.roots.push(index);
                0
            }
        };
        self.joints.push(Joint {
            name,
            index,
            parent,
            depth,
            offset,
            channels,
            children: Vec::new(),
            animation: Vec::new(),
        });
        index
    }

    pub(crate) fn joint_mut(&mut self, index: Index) -> &mut Joint {
        &mut self.joints[index]
    }

    pub fn roots(&self) -> impl Iterator<Item = JointRef<'_>> + '_ {
        self.roots.iter().map(move |&index| JointRef { skeleton: self, index })
    }

    /// Every joint, End Sites included, in document order.
    pub fn joints(&self) -> impl Iterator<Item = JointRef<'_>> + '_ {
        (0..self.joints.len()).map(move |index| JointRef { skeleton: self, index })
    }

    pub fn joint(&self, index: Index) -> Option<JointRef<'_>> {
        if index < self.joints.len() {
            Some(JointRef { skeleton: self, index })
        } else {
            None
        }
    }

    /// First joint with the given name in pre-order.
    pub fn find(&self, name: &str) -> Option<JointRef<'_>> {
        utils::preorder(self)
            .into_iter()
            .find(|&index| self.joints[index].name == name)
            .map(|index| JointRef { skeleton: self, index })
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    /// Number of motion values each frame carries.
    pub fn channel_count(&self) -> usize {
        self.joints.iter().map(|joint| joint.channels.len()).sum()
    }
}

/// Read handle on one joint of a [`Skeleton`].
#[derive(Debug, Clone, Copy)]
pub struct JointRef<'a> {
    skeleton: &'a Skeleton,
    index: Index,
}

impl<'a> JointRef<'a> {
    fn data(&self) -> &'a Joint {
        &self.skeleton.joints[self.index]
    }

    pub fn index(&self) -> Index {
        self.index
    }

    pub fn name(&self) -> &'a str {
        &self.data().name
    }

    pub fn offset(&self) -> Position {
        self.data().offset
    }

    pub fn channels(&self) -> &'a [Channel] {
        &self.data().channels
    }

    pub fn animation(&self) -> &'a [Frame] {
        &self.data().animation
    }

    pub fn depth(&self) -> usize {
        self.data().depth
    }

    pub fn is_end_site(&self) -> bool {
        self.data().is_end_site()
    }

    pub fn parent(&self) -> Option<JointRef<'a>> {
        let skeleton = self.skeleton;
        self.data().parent.map(|index| JointRef { skeleton, index })
    }

    pub fn children(&self) -> impl Iterator<Item = JointRef<'a>> + 'a {
        let skeleton = self.skeleton;
        self.data()
            .children
            .iter()
            .map(move |&index| JointRef { skeleton, index })
    }

    /// Rest-pose position: this joint's offset plus every ancestor's offset.
    pub fn global_offset(&self) -> Position {
        let mut position = Position::zero();
        let mut current = Some(*self);
        while let Some(joint) = current {
            position += joint.offset();
            current = joint.parent();
        }
        position
    }

    /// Time series `(time, value)` of one channel, or `None` if the joint doesn't declare it.
    pub fn channel_values(&self, channel: &Channel) -> Option<Vec<(f64, f64)>> {
        let column = self.channels().iter().position(|c| c == channel)?;
        Some(
            self.animation()
                .iter()
                .map(|frame| (frame.time, frame.values[column]))
                .collect(),
        )
    }
}

impl PartialEq for JointRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.skeleton, other.skeleton) && self.index == other.index
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////

/// A fully parsed .bvh document.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bvh {
    pub skeleton: Skeleton,
    pub num_frames: usize,
    pub frame_time: f64,
}

impl Bvh {
    /// Frames per second, `None` when the frame time is not positive.
    pub fn fps(&self) -> Option<f64> {
        if self.frame_time > 0.0 {
            Some(1.0 / self.frame_time)
        } else {
            None
        }
    }

    pub fn duration(&self) -> f64 {
        self.num_frames as f64 * self.frame_time
    }
}

/////////////////////////////////////////////////////////////////////////////////////////////////
