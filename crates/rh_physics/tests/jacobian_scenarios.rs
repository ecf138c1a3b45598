// crates/rh_physics/tests/jacobian_scenarios.rs

//! 雅可比组装场景测试
//!
//! # 测试覆盖
//!
//! - 平坦积水单柱的地表对角（闭式解）
//! - Dirichlet 面的对角贡献（闭式解）
//! - 渗出面、起转、简化坡面漫流的积水项与干地表阻尼
//! - 地表/地下分块前后系数守恒
//! - 域外单位行与压力无关
//! - 对称存储镜像后与完整存储一致
//! - 矩阵向量乘与 CSR 导出一致

use rh_config::{JacobianConfig, OverlandModel};
use rh_physics::numerics::CsrMatrix;
use rh_physics::{
    BcValue, BoundaryCondition, BoundaryPatchSet, ConstantDensity, ConstitutiveLaws, DomainGeometry,
    ExponentialSaturation, Field, GardnerRelPerm, Grid, PatchSide, ProblemData, ProblemDataBuilder,
    RichardsJacobian, Spatial, StencilSlot,
};

// ============================================================================
// 测试辅助函数
// ============================================================================

/// 顶面一个边界片，其余面零通量
fn top_patches(grid: &Grid, geometry: &DomainGeometry, top: BoundaryCondition) -> BoundaryPatchSet {
    BoundaryPatchSet::builder()
        .side("top", PatchSide::Top, top)
        .build(grid, geometry)
        .unwrap()
}

fn assembler(builder: ProblemDataBuilder, laws: ConstitutiveLaws) -> RichardsJacobian {
    let problem = builder.build().unwrap();
    RichardsJacobian::local(JacobianConfig::default(), problem, laws).unwrap()
}

fn unsaturated_laws() -> ConstitutiveLaws {
    ConstitutiveLaws::new(
        ConstantDensity(1.0),
        ExponentialSaturation {
            alpha: 1.0,
            residual: 0.1,
        },
        GardnerRelPerm { alpha: 2.0 },
    )
}

fn assert_csr_close(a: &CsrMatrix, b: &CsrMatrix, tol: f64) {
    assert_eq!(a.n_rows(), b.n_rows());
    for r in 0..a.n_rows() {
        for c in 0..a.n_cols() {
            let (x, y) = (a.get(r, c), b.get(r, c));
            assert!((x - y).abs() <= tol * (1.0 + y.abs()), "({r}, {c}): {x} vs {y}");
        }
    }
}

// ============================================================================
// 单柱积水
// ============================================================================

#[test]
fn test_flat_ponded_column_surface_diagonal() {
    let grid = Grid::uniform([1, 1, 3], [1.0, 1.0, 0.5]).unwrap();
    let geometry = DomainGeometry::full(&grid);
    let surface = grid.surface();
    let p = Field::filled(&grid, 0.1).unwrap();

    let kinematic = top_patches(&grid, &geometry, BoundaryCondition::overland_kinematic(BcValue::Constant(0.0)));
    let mut overland = assembler(
        ProblemData::builder(grid.clone(), geometry.clone()).patches(kinematic),
        ConstitutiveLaws::default(),
    );
    let no_flux = top_patches(&grid, &geometry, BoundaryCondition::no_flux());
    let mut reference = assembler(
        ProblemData::builder(grid.clone(), geometry.clone()).patches(no_flux),
        ConstitutiveLaws::default(),
    );
    let j_ref = reference.evaluate(&p, &p, 1.0, 0.0, false).unwrap().j().clone();

    let pair = overland.evaluate(&p, &p, 1.0, 0.0, false).unwrap();
    let jc = pair.jc().expect("运动波问题应当有 JC");

    // 顶面单元：竖向面系数 2，积水项 V/dz = 1
    let vol_over_dz = 1.0 * 1.0 * 0.5 / 0.5;
    let center = jc.entry(&surface, StencilSlot::Center, 0, 0, 0);
    assert!((center - (j_ref.entry(&grid, StencilSlot::Center, 0, 0, 2) + vol_over_dz)).abs() < 1e-12);
    assert!((center - 3.0).abs() < 1e-12);

    // 零坡度：坡面通量导数为零
    for slot in StencilSlot::LATERAL {
        assert!(jc.entry(&surface, slot, 0, 0, 0).abs() < 1e-14, "{slot:?}");
    }

    let j = pair.j();
    assert_eq!(j.entry(&grid, StencilSlot::Center, 0, 0, 2), 0.0);
    let lower = j.entry(&grid, StencilSlot::Lower, 0, 0, 2);
    assert!((lower - j_ref.entry(&grid, StencilSlot::Lower, 0, 0, 2)).abs() < 1e-14);
    assert!((lower + 2.0).abs() < 1e-12);
}

// ============================================================================
// Dirichlet 行
// ============================================================================

#[test]
fn test_dirichlet_row_closed_form() {
    // 常数本构：Dirichlet 面只在对角上留下传导系数
    let (dx, dy, dz) = (2.0, 1.0, 0.5);
    let grid = Grid::uniform([1, 1, 2], [dx, dy, dz]).unwrap();
    let geometry = DomainGeometry::full(&grid);
    let (kx, kz) = (3.0, 0.7);
    let zm = [2.0, 1.0];
    let dt = 0.5;
    let p = Field::filled(&grid, -0.3).unwrap();

    let diagonal = |side: fn() -> BoundaryCondition| {
        let patches = BoundaryPatchSet::builder()
            .side("west", PatchSide::West, side())
            .side("bottom", PatchSide::Bottom, side())
            .build(&grid, &geometry)
            .unwrap();
        let problem = ProblemData::builder(grid.clone(), geometry.clone())
            .permeability_xyz(kx, 1.0, kz)
            .z_mult(zm.to_vec())
            .patches(patches)
            .build()
            .unwrap();
        let mut ev = RichardsJacobian::local(JacobianConfig::default(), problem, ConstitutiveLaws::default()).unwrap();
        let j = ev.evaluate(&p, &p, dt, 0.0, false).unwrap().j().clone();
        [0, 1].map(|k| j.entry(&grid, StencilSlot::Center, 0, 0, k))
    };
    let reference = diagonal(BoundaryCondition::no_flux);
    let fixed = diagonal(|| BoundaryCondition::dirichlet(BcValue::Constant(0.4)));

    let mu = JacobianConfig::default().physics.viscosity;
    let west = |k: usize| dt * dy * dz * zm[k] * (2.0 / dx) * kx / mu;
    let lower = dt * dx * dy * (2.0 / (dz * 0.5 * (zm[0] + zm[1]))) * kz / mu;
    assert!((fixed[0] - reference[0] - (west(0) + lower)).abs() < 1e-12, "{fixed:?} {reference:?}");
    assert!((fixed[1] - reference[1] - west(1)).abs() < 1e-12, "{fixed:?} {reference:?}");
}

// ============================================================================
// 顶面积水项
// ============================================================================

const TOP_DT: f64 = 0.25;
/// 单元体积除以层厚再乘时间步：2·3·0.25
const PONDING_TERM: f64 = 1.5;

/// 单个顶面单元的对角；有 JC 时取 JC 的对角
fn top_diagonal(config: &JacobianConfig, top: BoundaryCondition, p: f64) -> f64 {
    let grid = Grid::uniform([1, 1, 1], [2.0, 3.0, 0.5]).unwrap();
    let geometry = DomainGeometry::full(&grid);
    let problem = ProblemData::builder(grid.clone(), geometry.clone())
        .z_mult(3.0)
        .patches(top_patches(&grid, &geometry, top))
        .build()
        .unwrap();
    let mut ev = RichardsJacobian::local(config.clone(), problem, ConstitutiveLaws::default()).unwrap();
    let p = Field::filled(&grid, p).unwrap();
    let pair = ev.evaluate(&p, &p, TOP_DT, 0.0, false).unwrap();
    match pair.jc() {
        Some(jc) => jc.entry(&grid.surface(), StencilSlot::Center, 0, 0, 0),
        None => pair.j().entry(&grid, StencilSlot::Center, 0, 0, 0),
    }
}

/// 相对零通量顶面多出的对角量
fn extra_diagonal(config: &JacobianConfig, top: BoundaryCondition, p: f64) -> f64 {
    top_diagonal(config, top, p) - top_diagonal(&JacobianConfig::default(), BoundaryCondition::no_flux(), p)
}

fn assert_close(got: f64, want: f64, what: &str) {
    assert!((got - want).abs() < 1e-12, "{what}: {got} vs {want}");
}

#[test]
fn test_seepage_ponding_term() {
    let config = JacobianConfig::default();
    for (p, want) in [(0.1, PONDING_TERM), (0.0, PONDING_TERM), (-0.1, 0.0)] {
        assert_close(extra_diagonal(&config, BoundaryCondition::seepage(), p), want, &format!("p = {p}"));
    }
}

#[test]
fn test_spinup_overland_ponding_term() {
    let mut config = JacobianConfig::default();
    config.use_jacobian = true;
    config.overland.model = OverlandModel::Kinematic;
    config.overland.spinup = true;
    let top = || BoundaryCondition::overland(BcValue::Constant(0.0));

    // 积水时搬到 JC 的对角另加 V/dz；零坡度下坡面导数为零
    let vol_over_dz = 2.0 * 3.0;
    assert_close(extra_diagonal(&config, top(), 0.1), PONDING_TERM + vol_over_dz, "p > 0");
    assert_close(extra_diagonal(&config, top(), 0.0), PONDING_TERM, "p = 0");
    assert_close(extra_diagonal(&config, top(), -0.1), 0.0, "p < 0");
}

#[test]
fn test_simple_overland_ponding_term() {
    // 未启用完整雅可比：通用坡面漫流按简化方式组装，只改 J
    let config = JacobianConfig::default();
    let top = || BoundaryCondition::overland(BcValue::Constant(0.0));

    // V·zm/(dz·mean(zm, zm_up))·(dt + 1)，顶层以上沿用顶层乘子
    let (vol, dz, zm) = (2.0 * 3.0 * 0.5, 0.5, 3.0);
    let want = vol * zm / (dz * zm) * (TOP_DT + 1.0);
    assert_close(extra_diagonal(&config, top(), 0.1), want, "p > 0");
    assert_close(extra_diagonal(&config, top(), 0.0), 0.0, "p = 0");
    assert_close(extra_diagonal(&config, top(), -0.1), 0.0, "p < 0");
}

#[test]
fn test_dry_surface_damping() {
    let mut config = JacobianConfig::default();
    config.use_jacobian = true;
    config.overland.model = OverlandModel::Kinematic;
    config.overland.spinup_damp_p1 = 10.0;
    config.overland.spinup_damp_p2 = 0.1;
    let (p1, p2) = (10.0, 0.1);

    let generic = || BoundaryCondition::overland(BcValue::Constant(0.0));
    for p in [-0.05, -0.3, 0.0] {
        let want = PONDING_TERM * p1 * (p * p1).exp() * p2;
        assert_close(extra_diagonal(&config, generic(), p), want, &format!("p = {p}"));
    }

    // 显式运动波边界不加阻尼
    let kinematic = BoundaryCondition::overland_kinematic(BcValue::Constant(0.0));
    assert_close(extra_diagonal(&config, kinematic, -0.05), 0.0, "运动波");
}

// ============================================================================
// 分块守恒
// ============================================================================

#[test]
fn test_decomposition_conserves_row() {
    let grid = Grid::uniform([3, 2, 3], [1.0, 2.0, 0.5]).unwrap();
    let surface = grid.surface();
    let geometry = DomainGeometry::from_column_tops(&grid, &[2, 2, 1, 2, 2, 2]).unwrap();
    // 全部非饱和：坡面导数为零，JC 只含搬来的系数
    let p = Field::from_fn(&grid, |i, j, k| -0.2 - 0.05 * i as f64 - 0.07 * j as f64 - 0.03 * k as f64).unwrap();

    let builder = |top: BoundaryCondition| {
        let patches = top_patches(&grid, &geometry, top);
        ProblemData::builder(grid.clone(), geometry.clone())
            .permeability(Spatial::from_fn(|i, _, k| 1.0 + 0.3 * i as f64 + 0.1 * k as f64))
            .porosity(0.4)
            .specific_storage(1e-3)
            .patches(patches)
    };
    let mut reference = assembler(builder(BoundaryCondition::no_flux()), unsaturated_laws());
    let mut overland = assembler(
        builder(BoundaryCondition::overland_kinematic(BcValue::Constant(0.0))),
        unsaturated_laws(),
    );

    let j_ref = reference.evaluate(&p, &p, 0.5, 0.0, false).unwrap().j().clone();
    let pair = overland.evaluate(&p, &p, 0.5, 0.0, false).unwrap();
    let j = pair.j();
    let jc = pair.jc().unwrap();

    for (ci, cj) in [(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)] {
        let k = geometry.top_index(ci, cj);
        let mut before = 0.0;
        let mut after = 0.0;
        for slot in StencilSlot::ALL {
            before += j_ref.entry(&grid, slot, ci, cj, k);
            after += j.entry(&grid, slot, ci, cj, k);
        }
        for slot in StencilSlot::ALL.into_iter().filter(|s| !matches!(s, StencilSlot::Lower | StencilSlot::Upper)) {
            after += jc.entry(&surface, slot, ci, cj, 0);
        }
        assert!((before - after).abs() < 1e-12, "列 ({ci}, {cj}): {before} vs {after}");

        let center = jc.entry(&surface, StencilSlot::Center, ci, cj, 0);
        assert!((center - j_ref.entry(&grid, StencilSlot::Center, ci, cj, k)).abs() < 1e-12);

        for slot in StencilSlot::LATERAL {
            let o = slot.offset();
            let original = j_ref.entry(&grid, slot, ci, cj, k);
            let moved = jc.entry(&surface, slot, ci, cj, 0);
            let kept = j.entry(&grid, slot, ci, cj, k);
            if geometry.top_index(ci + o.x, cj + o.y) == k {
                assert!((moved - original).abs() < 1e-12);
                assert_eq!(kept, 0.0);
            } else {
                assert!((kept - original).abs() < 1e-12);
                assert_eq!(moved, 0.0);
            }
        }
    }
}

// ============================================================================
// 域外单元
// ============================================================================

#[test]
fn test_outside_rows_are_identity() {
    let grid = Grid::uniform([3, 1, 3], [1.0, 1.0, 1.0]).unwrap();
    let geometry = DomainGeometry::from_column_tops(&grid, &[2, 0, 1]).unwrap();
    let patches = top_patches(&grid, &geometry, BoundaryCondition::overland_kinematic(BcValue::Constant(0.0)));
    let mut ev = assembler(
        ProblemData::builder(grid.clone(), geometry.clone())
            .slopes(0.2, 0.0)
            .patches(patches),
        unsaturated_laws(),
    );

    let dry = Field::filled(&grid, -1.0).unwrap();
    let wet = Field::from_fn(&grid, |i, _, k| 0.05 + 0.1 * i as f64 + 0.01 * k as f64).unwrap();
    for p in [&dry, &wet] {
        let pair = ev.evaluate(p, p, 1.0, 0.0, false).unwrap();
        let j = pair.j();
        for (i, jj, k) in grid.global_range() {
            if geometry.is_inside(i, jj, k) {
                continue;
            }
            for slot in StencilSlot::ALL {
                let expected = if slot == StencilSlot::Center { 1.0 } else { 0.0 };
                assert_eq!(j.entry(&grid, slot, i, jj, k), expected, "({i}, {jj}, {k}) {slot:?}");
            }
        }
    }
}

// ============================================================================
// 对称存储
// ============================================================================

fn heterogeneous(grid: &Grid, geometry: &DomainGeometry, patches: BoundaryPatchSet) -> ProblemDataBuilder {
    ProblemData::builder(grid.clone(), geometry.clone())
        .permeability_xyz(
            Spatial::from_fn(|i, j, k| 1.0 + 0.5 * i as f64 + 0.25 * (j * k) as f64),
            Spatial::from_fn(|i, _, _| 2.0 - 0.2 * i as f64),
            0.7,
        )
        .slopes(
            Spatial::from_fn(|i, _, _| 0.1 + 0.02 * i as f64),
            Spatial::from_fn(|_, j, _| -0.05 * (j + 1) as f64),
        )
        .z_mult(Spatial::from_fn(|_, _, k| if k == 0 { 2.0 } else { 1.0 }))
}

#[test]
fn test_symmetric_mirror_matches_full() {
    let grid = Grid::uniform([4, 3, 3], [1.0, 1.0, 0.5]).unwrap();
    let geometry = DomainGeometry::full(&grid);
    let patches = BoundaryPatchSet::builder()
        .side("west", PatchSide::West, BoundaryCondition::dirichlet(BcValue::Constant(0.5)))
        .build(&grid, &geometry)
        .unwrap();
    // 常数本构关系：雅可比没有非对称部分
    let mut ev = assembler(heterogeneous(&grid, &geometry, patches), ConstitutiveLaws::default());
    let p = Field::from_fn(&grid, |i, j, k| -1.0 + 0.2 * i as f64 - 0.1 * j as f64 + 0.3 * k as f64).unwrap();

    let symmetric = {
        let pair = ev.evaluate(&p, &p, 0.25, 0.0, true).unwrap();
        assert!(!pair.is_full_storage());
        assert!(pair.jc().is_none());
        pair.j().mirrored()
    };
    let full = ev.evaluate(&p, &p, 0.25, 0.0, false).unwrap().j().clone();

    for (i, j, k) in grid.global_range() {
        for slot in StencilSlot::ALL {
            let a = symmetric.entry(&grid, slot, i, j, k);
            let b = full.entry(&grid, slot, i, j, k);
            assert!((a - b).abs() < 1e-12 * (1.0 + b.abs()), "({i}, {j}, {k}) {slot:?}: {a} vs {b}");
        }
    }
}

#[test]
fn test_symmetric_overland_matches_full() {
    let grid = Grid::uniform([4, 3, 2], [1.0, 1.0, 1.0]).unwrap();
    let geometry = DomainGeometry::full(&grid);
    let patches = top_patches(&grid, &geometry, BoundaryCondition::overland_kinematic(BcValue::Constant(-1e-3)));
    let mut ev = assembler(heterogeneous(&grid, &geometry, patches), ConstitutiveLaws::default());
    let p = Field::from_fn(&grid, |i, j, k| if k == 1 { 0.02 * (i + j + 1) as f64 } else { 0.5 }).unwrap();

    let symmetric = {
        let pair = ev.evaluate(&p, &p, 1.0, 0.0, true).unwrap();
        // 抽取 JC 前已镜像为完整存储
        assert!(pair.is_full_storage());
        pair.to_csr()
    };
    let full = ev.evaluate(&p, &p, 1.0, 0.0, false).unwrap().to_csr();
    assert_csr_close(&symmetric, &full, 1e-12);
}

// ============================================================================
// 矩阵向量乘
// ============================================================================

#[test]
fn test_apply_matches_csr_with_surface_block() {
    let grid = Grid::uniform([3, 2, 3], [1.0, 1.0, 0.5]).unwrap();
    let geometry = DomainGeometry::from_column_tops(&grid, &[2, 1, 2, 2, 2, 0]).unwrap();
    let patches = top_patches(&grid, &geometry, BoundaryCondition::overland_kinematic(BcValue::Constant(0.0)));
    let mut ev = assembler(
        ProblemData::builder(grid.clone(), geometry.clone())
            .slopes(0.05, -0.02)
            .mannings(0.03)
            .patches(patches),
        unsaturated_laws(),
    );
    let p = Field::from_fn(&grid, |i, j, k| 0.1 * (i + 1) as f64 - 0.05 * j as f64 - 0.2 * (2 - k) as f64).unwrap();
    let pair = ev.evaluate(&p, &p, 1.0, 0.0, false).unwrap();

    let [nx, ny, _] = grid.extents();
    let value = |i: i32, j: i32, k: i32| 1.0 + 0.5 * i as f64 - 0.25 * j as f64 + 0.125 * k as f64;
    let mut x = Field::from_fn(&grid, value).unwrap();
    let mut y = Field::new(&grid).unwrap();
    pair.apply(&mut x, &mut y).unwrap();

    let csr = pair.to_csr();
    let xv: Vec<f64> = grid.global_range().iter().map(|(i, j, k)| value(i, j, k)).collect();
    let mut yv = vec![0.0; xv.len()];
    csr.mul_vec(&xv, &mut yv);

    for (i, j, k) in grid.global_range() {
        let idx = (i + nx * (j + ny * k)) as usize;
        let got = y.value_at(&grid, i, j, k).unwrap();
        assert!((got - yv[idx]).abs() < 1e-12 * (1.0 + yv[idx].abs()), "({i}, {j}, {k})");
    }
}

#[test]
fn test_reassembly_starts_from_zero() {
    let grid = Grid::uniform([3, 3, 2], [1.0, 1.0, 1.0]).unwrap();
    let geometry = DomainGeometry::full(&grid);
    let patches = top_patches(&grid, &geometry, BoundaryCondition::overland_diffusive(BcValue::Constant(0.0)));
    let mut ev = assembler(
        ProblemData::builder(grid.clone(), geometry).slopes(0.1, 0.05).patches(patches),
        unsaturated_laws(),
    );
    let wet = Field::from_fn(&grid, |i, j, _| 0.01 + 0.02 * (i * j) as f64).unwrap();
    let dry = Field::filled(&grid, -0.5).unwrap();

    let first = ev.evaluate(&wet, &wet, 1.0, 0.0, false).unwrap().to_csr();
    let _ = ev.evaluate(&dry, &dry, 1.0, 0.0, false).unwrap();
    let second = ev.evaluate(&wet, &wet, 1.0, 0.0, false).unwrap().to_csr();
    assert_csr_close(&first, &second, 0.0);
}
