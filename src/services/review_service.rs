use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    dto::reviews::{AddCommentRequest, AddRatingRequest, CommentList, RatingSummary},
    entity::reviews::{ActiveModel, Column, Entity as Reviews},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{ApiResponse, Meta},
    services::product_service::find_product,
    state::AppState,
};

fn checked_rating(rating: i64) -> AppResult<i16> {
    match rating {
        1..=5 => Ok(rating as i16),
        _ => Err(AppError::BadRequest(
            "Rating should be between 1 and 5".into(),
        )),
    }
}

/// One rating per reviewer per product; the unique index settles races.
pub async fn add_rating(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddRatingRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let rating = checked_rating(payload.rating)?;
    find_product(&state.orm, product_id).await?;

    let review = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        reviewer_id: Set(user.user_id),
        rating: Set(rating),
        comment: Set(String::new()),
        created_at: NotSet,
    };
    let inserted = Reviews::insert(review)
        .on_conflict(
            OnConflict::columns([Column::ProductId, Column::ReviewerId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&state.orm)
        .await?;
    if inserted == 0 {
        return Err(AppError::BadRequest(
            "Rating already exists for this user".into(),
        ));
    }

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ReviewRating,
        serde_json::json!({ "product_id": product_id, "rating": rating }),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully added rating",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_rating(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<RatingSummary>> {
    find_product(&state.orm, product_id).await?;

    let (average_rating, total_reviews): (f64, i64) = sqlx::query_as(
        "SELECT COALESCE(AVG(rating)::float8, 0), COUNT(*) FROM reviews WHERE product_id = $1",
    )
    .bind(product_id)
    .fetch_one(&state.pool)
    .await?;

    let message = if total_reviews == 0 {
        "No reviews present for the product"
    } else {
        "Average rating of the product"
    };
    Ok(ApiResponse::success(
        message,
        RatingSummary {
            average_rating,
            total_reviews,
        },
        Some(Meta::empty()),
    ))
}

/// A comment needs an existing rating by the same reviewer and can only be
/// set once.
pub async fn add_comment(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: AddCommentRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let comment = payload.comment.trim().to_string();
    if comment.is_empty() {
        return Err(AppError::BadRequest("Comment should be present".into()));
    }
    find_product(&state.orm, product_id).await?;

    let updated = Reviews::update_many()
        .col_expr(Column::Comment, Expr::value(comment.clone()))
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::ReviewerId.eq(user.user_id))
        .filter(Column::Comment.eq(""))
        .exec(&state.orm)
        .await?;

    if updated.rows_affected == 0 {
        let review = Reviews::find()
            .filter(Column::ProductId.eq(product_id))
            .filter(Column::ReviewerId.eq(user.user_id))
            .one(&state.orm)
            .await?;
        let reason = match review {
            None => "Enter the rating first",
            Some(_) => "Comment already exists for this user",
        };
        return Err(AppError::BadRequest(reason.into()));
    }

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::ReviewComment,
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Successfully added comment",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn get_comments(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<CommentList>> {
    find_product(&state.orm, product_id).await?;

    let comments: Vec<String> = Reviews::find()
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::Comment.ne(""))
        .order_by_asc(Column::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|r| r.comment)
        .collect();

    let total_comments = comments.len();
    Ok(ApiResponse::success(
        "Successfully retrieved comments",
        CommentList {
            comments,
            total_comments,
        },
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratings_outside_one_to_five_are_rejected() {
        assert_eq!(checked_rating(1).unwrap(), 1);
        assert_eq!(checked_rating(5).unwrap(), 5);
        for bad in [0, 6, -3, i64::MAX] {
            assert!(checked_rating(bad).is_err());
        }
    }
}
