use std::fmt;
use std::rc::Rc;

use crate::class::Class;
use crate::frame::Frame;
use crate::nodes::BlockBody;
use crate::universe::Universe;
use crate::SOMRef;

/// A closure over the activation its block expression was evaluated in.
#[derive(Clone)]
pub struct Block {
    /// Non-local returns unwind to this frame's method activation.
    pub frame: SOMRef<Frame>,
    /// The compiled block body, shared by every closure created from the same block expression.
    pub body: Rc<BlockBody>,
}

impl Block {
    pub fn class(&self, universe: &Universe) -> SOMRef<Class> {
        match self.nb_parameters() {
            0 => universe.block1_class(),
            1 => universe.block2_class(),
            2 => universe.block3_class(),
            _ => universe.block_class(),
        }
    }

    pub fn nb_parameters(&self) -> usize {
        self.body.nb_parameters
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct(&format!("Block{}", self.nb_parameters() + 1))
            .finish()
    }
}
