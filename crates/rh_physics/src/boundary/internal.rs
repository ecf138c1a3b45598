// crates/rh_physics/src/boundary/internal.rs

//! 域内边界
//!
//! 域内的固定压力点（井、观测孔等）在每次组装的最后直接修改雅可比：
//! 该点的行替换为单位行，相邻单元指向该点的耦合系数置零。

use glam::IVec3;

use crate::stencil::{StencilBlock, StencilSlot};

/// 域内边界对雅可比的贡献
pub trait InternalBoundary: Send + Sync {
    /// 修改一个子网格的矩阵块（只写拥有单元）
    fn apply(&self, j: &mut StencilBlock);
}

/// 没有域内边界
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInternalBoundary;

impl InternalBoundary for NoInternalBoundary {
    fn apply(&self, _j: &mut StencilBlock) {}
}

/// 域内固定压力点
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalDirichletPoints {
    points: Vec<IVec3>,
}

impl InternalDirichletPoints {
    /// 由全局坐标创建
    pub fn new(points: impl IntoIterator<Item = IVec3>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// 全部点
    pub fn points(&self) -> &[IVec3] {
        &self.points
    }
}

impl InternalBoundary for InternalDirichletPoints {
    fn apply(&self, j: &mut StencilBlock) {
        let gbox = *j.gbox();
        for p in &self.points {
            if gbox.owns(p.x, p.y, p.z) {
                j.set_identity_row(p.x, p.y, p.z);
            }
            for slot in StencilSlot::NEIGHBORS {
                let n = *p + slot.offset();
                if gbox.owns(n.x, n.y, n.z) && j.shape().has(slot.opposite()) {
                    j.set(slot.opposite(), n.x, n.y, n.z, 0.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stencil::StencilShape;
    use rh_foundation::GhostBox;

    #[test]
    fn test_fixed_point_rows() {
        let gbox = GhostBox::new([0, 0, 0], [3, 1, 1], 1).unwrap();
        let mut j = StencilBlock::new(gbox, StencilShape::Seven);
        for (i, _, _) in gbox.owned() {
            j.set(StencilSlot::Center, i, 0, 0, 4.0);
            j.set(StencilSlot::West, i, 0, 0, -1.0);
            j.set(StencilSlot::East, i, 0, 0, -1.0);
        }
        InternalDirichletPoints::new([IVec3::new(1, 0, 0)]).apply(&mut j);

        assert_eq!(j.row(1, 0, 0), [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(j.get(StencilSlot::East, 0, 0, 0), 0.0);
        assert_eq!(j.get(StencilSlot::West, 2, 0, 0), 0.0);
        assert_eq!(j.get(StencilSlot::West, 0, 0, 0), -1.0);
        assert_eq!(j.get(StencilSlot::Center, 2, 0, 0), 4.0);
    }

    #[test]
    fn test_point_outside_block() {
        let gbox = GhostBox::new([0, 0, 0], [2, 1, 1], 1).unwrap();
        let mut j = StencilBlock::new(gbox, StencilShape::Seven);
        j.set(StencilSlot::East, 1, 0, 0, -2.0);
        // 点在块外，只影响拥有的邻居
        InternalDirichletPoints::new([IVec3::new(2, 0, 0)]).apply(&mut j);
        assert_eq!(j.get(StencilSlot::East, 1, 0, 0), 0.0);
        NoInternalBoundary.apply(&mut j);
    }
}
