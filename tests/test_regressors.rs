//! Integration test: every regressor kind through the common trait

mod common;

use common::linear_matrix;
use model_trainer::training::GridSearch;
use model_trainer::{r2_score, ModelKind, ParamGrid, ParamValue, Params, Regressor, TrainerError};
use ndarray::{s, Array2};

#[test]
fn test_every_kind_fits_linear_data() {
    let train = linear_matrix(80, 3, 31);
    let x = train.slice(s![.., ..3]).to_owned();
    let y = train.column(3).to_owned();

    for kind in ModelKind::ALL {
        let mut model = kind.create();
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted());
        let r2 = r2_score(&y, &model.predict(&x).unwrap()).unwrap();
        assert!(r2 > 0.7, "{} training R² = {}", kind, r2);
    }
}

#[test]
fn test_every_kind_rejects_predict_before_fit() {
    for kind in ModelKind::ALL {
        let model = kind.create();
        assert!(
            matches!(model.predict(&Array2::zeros((2, 3))), Err(TrainerError::ModelNotFitted)),
            "{}",
            kind
        );
    }
}

#[test]
fn test_every_kind_rejects_wrong_width() {
    let train = linear_matrix(30, 3, 32);
    let x = train.slice(s![.., ..3]).to_owned();
    let y = train.column(3).to_owned();
    for kind in ModelKind::ALL {
        let mut model = kind.create();
        model.fit(&x, &y).unwrap();
        assert!(model.predict(&Array2::zeros((2, 4))).is_err(), "{}", kind);
    }
}

#[test]
fn test_default_grid_sizes() {
    assert_eq!(ModelKind::GradientBoosting.default_grid().n_combinations(), 72);
    assert_eq!(ModelKind::CatBoost.default_grid().n_combinations(), 27);
    assert_eq!(ModelKind::LinearRegression.default_grid().n_combinations(), 1);
}

#[test]
fn test_unknown_param_rejected() {
    let mut model = ModelKind::XGBoost.create();
    let grid = ParamGrid::new().with("not_a_param", vec![1i64]);
    for combo in grid.combinations() {
        assert!(matches!(
            model.set_params(&combo),
            Err(TrainerError::InvalidParameter { .. })
        ));
    }
}

#[test]
fn test_grid_search_reports_every_combination() {
    let train = linear_matrix(45, 2, 33);
    let x = train.slice(s![.., ..2]).to_owned();
    let y = train.column(2).to_owned();

    let outcome = GridSearch::new(ModelKind::AdaBoost.create(), ModelKind::AdaBoost.default_grid())
        .with_folds(3)
        .fit(&x, &y)
        .unwrap();
    assert_eq!(outcome.results.len(), 12);
    assert!(outcome.model.is_fitted());
    assert!(outcome.results.iter().all(|r| r.cv.n_folds == 3));
    assert!(outcome.results.iter().any(|r| r.params == outcome.best_params));
}

#[test]
fn test_large_seeds_survive_param_round_trip() {
    let train = linear_matrix(40, 2, 34);
    let x = train.slice(s![.., ..2]).to_owned();
    let y = train.column(2).to_owned();

    for kind in ModelKind::ALL {
        let mut model = kind.create();
        if !model.get_params().contains_key("random_state") {
            continue;
        }
        let mut seed = Params::new();
        seed.insert("random_state".into(), ParamValue::UInt(u64::MAX));
        model.set_params(&seed).unwrap();

        let params = model.get_params();
        assert_eq!(params["random_state"], ParamValue::UInt(u64::MAX), "{}", kind);
        model.set_params(&params).unwrap();
        model.fit(&x, &y).unwrap();
        assert!(model.is_fitted(), "{}", kind);
    }
}
