use chrono::{Duration, Utc};
use uuid::Uuid;

use engine::{
    AnalysisPeriod, EngineError, ExpenseAnalysisFilter, ExpenseListFilter, ExpenseSort,
    NewExpenseCmd, PageRequest, RecurrenceInterval, SortOrder, UpdateExpenseCmd,
};

mod common;
use common::{at, cents, day, default_category};

#[tokio::test]
async fn create_validates_amount_date_and_recurrence() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;

    let err = engine
        .create_expense(NewExpenseCmd::new(user, food, cents(0), at(2025, 1, 1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_expense(NewExpenseCmd::new(
            user,
            food,
            cents(100),
            Utc::now() + Duration::days(1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let mut cmd = NewExpenseCmd::new(user, food, cents(100), at(2025, 1, 1));
    cmd.is_recurring = true;
    let err = engine.create_expense(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));

    let mut cmd = NewExpenseCmd::new(user, food, cents(100), at(2025, 1, 1));
    cmd.recurrence_interval = Some(RecurrenceInterval::Weekly);
    let err = engine.create_expense(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));

    let err = engine
        .create_expense(NewExpenseCmd::new(
            user,
            Uuid::new_v4(),
            cents(100),
            at(2025, 1, 1),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCategory(_)));

    let page = engine
        .list_expenses(user, &ExpenseListFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);

    let expense = engine
        .create_expense(
            NewExpenseCmd::new(user, food, cents(1_999), at(2025, 1, 1))
                .description("  lunch  ")
                .recurring(RecurrenceInterval::Monthly),
        )
        .await
        .unwrap();
    assert_eq!(expense.description.as_deref(), Some("lunch"));
    assert!(expense.is_recurring);
    assert_eq!(expense.recurrence_interval, Some(RecurrenceInterval::Monthly));

    let loaded = engine.expense(user, expense.id).await.unwrap();
    assert_eq!(loaded.amount, cents(1_999));
    assert_eq!(loaded.date, at(2025, 1, 1));
    assert_eq!(loaded.recurrence_interval, Some(RecurrenceInterval::Monthly));
}

#[tokio::test]
async fn expenses_are_private_to_their_owner() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let stranger = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;

    let expense = engine
        .create_expense(NewExpenseCmd::new(user, food, cents(500), at(2025, 1, 1)))
        .await
        .unwrap();

    let err = engine.expense(stranger, expense.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine
        .update_expense(UpdateExpenseCmd::new(stranger, expense.id).amount(cents(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.delete_expense(stranger, expense.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let page = engine
        .list_expenses(stranger, &ExpenseListFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn list_filters_sorts_and_paginates() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;
    let travel = default_category(&engine, "Travel").await;

    for (category, amount, date) in [
        (food, 1_000, at(2025, 1, 1)),
        (food, 3_000, at(2025, 1, 15)),
        (travel, 50_000, at(2025, 1, 20)),
        (food, 2_000, at(2025, 1, 31)),
        (food, 4_000, at(2025, 2, 1)),
    ] {
        engine
            .create_expense(NewExpenseCmd::new(user, category, cents(amount), date))
            .await
            .unwrap();
    }

    let page = engine
        .list_expenses(user, &ExpenseListFilter::default(), PageRequest::new(2, 2).unwrap())
        .await
        .unwrap();
    assert_eq!(page.total_count, 5);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.page, 2);
    let dates: Vec<_> = page.items.iter().map(|e| e.date).collect();
    assert_eq!(dates, vec![at(2025, 1, 20), at(2025, 1, 31)]);

    let january_food = ExpenseListFilter {
        start_date: Some(day(2025, 1, 1)),
        end_date: Some(day(2025, 1, 31)),
        category_id: Some(food),
        sort: ExpenseSort::Amount,
        order: SortOrder::Desc,
        ..Default::default()
    };
    let page = engine
        .list_expenses(user, &january_food, PageRequest::default())
        .await
        .unwrap();
    let amounts: Vec<_> = page.items.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![cents(3_000), cents(2_000), cents(1_000)]);

    let ranged = ExpenseListFilter {
        min_amount: Some(cents(2_000)),
        max_amount: Some(cents(4_000)),
        ..Default::default()
    };
    let page = engine
        .list_expenses(user, &ranged, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 3);

    let beyond = engine
        .list_expenses(user, &ExpenseListFilter::default(), PageRequest::new(9, 10).unwrap())
        .await
        .unwrap();
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.total_count, 5);

    let inverted = ExpenseListFilter {
        min_amount: Some(cents(5_000)),
        max_amount: Some(cents(1_000)),
        ..Default::default()
    };
    let err = engine
        .list_expenses(user, &inverted, PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    assert!(matches!(
        PageRequest::new(0, 10),
        Err(EngineError::InvalidFilter(_))
    ));
    assert!(matches!(
        PageRequest::new(1, 101),
        Err(EngineError::InvalidFilter(_))
    ));
}

#[tokio::test]
async fn update_merges_recurrence_with_stored_values() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;
    let travel = default_category(&engine, "Travel").await;

    let expense = engine
        .create_expense(
            NewExpenseCmd::new(user, food, cents(1_000), at(2025, 1, 1))
                .recurring(RecurrenceInterval::Weekly),
        )
        .await
        .unwrap();

    // Stays recurring with the stored interval.
    let updated = engine
        .update_expense(
            UpdateExpenseCmd::new(user, expense.id)
                .amount(cents(1_250))
                .category_id(travel),
        )
        .await
        .unwrap();
    assert_eq!(updated.amount, cents(1_250));
    assert_eq!(updated.category_id, travel);
    assert_eq!(updated.recurrence_interval, Some(RecurrenceInterval::Weekly));

    let mut cmd = UpdateExpenseCmd::new(user, expense.id);
    cmd.is_recurring = Some(false);
    let updated = engine.update_expense(cmd).await.unwrap();
    assert!(!updated.is_recurring);
    assert_eq!(updated.recurrence_interval, None);

    let mut cmd = UpdateExpenseCmd::new(user, expense.id);
    cmd.is_recurring = Some(true);
    let err = engine.update_expense(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));

    let err = engine
        .update_expense(UpdateExpenseCmd::new(user, expense.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NothingToUpdate));

    let err = engine
        .update_expense(
            UpdateExpenseCmd::new(user, expense.id).date(Utc::now() + Duration::days(2)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let stored = engine.expense(user, expense.id).await.unwrap();
    assert_eq!(stored.amount, cents(1_250));
    assert!(!stored.is_recurring);
}

#[tokio::test]
async fn receipts_follow_their_expense() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;

    let first = engine
        .create_receipt(user, "https://img.example/1.png", Some("TOTAL 12.00"))
        .await
        .unwrap();
    let second = engine
        .create_receipt(user, "https://img.example/2.png", None)
        .await
        .unwrap();
    assert!(first.expense_id.is_none());

    let err = engine.create_receipt(user, "   ", None).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidReceipt(_)));

    let expense = engine
        .create_expense(
            NewExpenseCmd::new(user, food, cents(1_200), at(2025, 1, 1)).receipt_id(first.id),
        )
        .await
        .unwrap();
    assert_eq!(expense.receipt_id, Some(first.id));
    let linked = engine.receipt(user, first.id).await.unwrap();
    assert_eq!(linked.expense_id, Some(expense.id));

    // A receipt backs one expense at most.
    let err = engine
        .create_expense(
            NewExpenseCmd::new(user, food, cents(300), at(2025, 1, 2)).receipt_id(first.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidReceipt(_)));

    // Receipts of other users are not visible.
    let err = engine
        .create_expense(
            NewExpenseCmd::new(Uuid::new_v4(), food, cents(300), at(2025, 1, 2))
                .receipt_id(second.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidReceipt(_)));

    let swapped = engine
        .update_expense(UpdateExpenseCmd::new(user, expense.id).receipt_id(second.id))
        .await
        .unwrap();
    assert_eq!(swapped.receipt_id, Some(second.id));
    assert!(engine.receipt(user, first.id).await.unwrap().expense_id.is_none());
    assert_eq!(
        engine.receipt(user, second.id).await.unwrap().expense_id,
        Some(expense.id)
    );

    engine.delete_expense(user, expense.id).await.unwrap();
    let err = engine.expense(user, expense.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    let err = engine.receipt(user, second.id).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
    assert!(engine.receipt(user, first.id).await.is_ok());
}

#[tokio::test]
async fn failed_writes_leave_receipts_untouched() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;

    let receipt = engine
        .create_receipt(user, "https://img.example/3.png", None)
        .await
        .unwrap();

    // The receipt is claimed before the category lookup fails.
    let err = engine
        .create_expense(
            NewExpenseCmd::new(user, Uuid::new_v4(), cents(500), at(2025, 1, 3))
                .receipt_id(receipt.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCategory(_)));
    assert!(engine.receipt(user, receipt.id).await.unwrap().expense_id.is_none());
    let page = engine
        .list_expenses(user, &ExpenseListFilter::default(), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total_count, 0);

    let expense = engine
        .create_expense(
            NewExpenseCmd::new(user, food, cents(500), at(2025, 1, 3)).receipt_id(receipt.id),
        )
        .await
        .unwrap();
    let replacement = engine
        .create_receipt(user, "https://img.example/4.png", None)
        .await
        .unwrap();

    let err = engine
        .update_expense(
            UpdateExpenseCmd::new(user, expense.id)
                .receipt_id(replacement.id)
                .category_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCategory(_)));
    assert_eq!(
        engine.receipt(user, receipt.id).await.unwrap().expense_id,
        Some(expense.id)
    );
    assert!(engine.receipt(user, replacement.id).await.unwrap().expense_id.is_none());
    let stored = engine.expense(user, expense.id).await.unwrap();
    assert_eq!(stored.receipt_id, Some(receipt.id));
    assert_eq!(stored.category_id, food);
}

#[tokio::test]
async fn analysis_aggregates_totals_timeline_and_categories() {
    let engine = common::engine().await;
    let user = Uuid::new_v4();
    let food = default_category(&engine, "Food & Dining").await;
    let travel = default_category(&engine, "Travel").await;

    for (category, amount, date) in [
        (food, 1_000, at(2025, 1, 1)),
        (food, 2_000, at(2025, 1, 1)),
        (food, 3_000, at(2025, 2, 10)),
        (travel, 14_000, at(2025, 2, 11)),
    ] {
        engine
            .create_expense(NewExpenseCmd::new(user, category, cents(amount), date))
            .await
            .unwrap();
    }

    let analysis = engine
        .analyze_expenses(user, &ExpenseAnalysisFilter::default())
        .await
        .unwrap();
    assert_eq!(analysis.period, AnalysisPeriod::Month);
    assert!(analysis.unavailable.is_empty());

    let totals = analysis.totals.unwrap();
    assert_eq!(totals.total, cents(20_000));
    assert_eq!(totals.count, 4);
    assert_eq!(totals.average, cents(5_000));
    assert_eq!(totals.max, cents(14_000));

    let timeline = analysis.timeline.unwrap();
    assert_eq!(timeline.distinct_days, 3);
    assert_eq!(timeline.daily_average, cents(6_667));
    let periods: Vec<_> = timeline.buckets.iter().map(|b| b.period.as_str()).collect();
    assert_eq!(periods, vec!["2025-01", "2025-02"]);
    assert_eq!(timeline.buckets[0].total, cents(3_000));
    assert_eq!(timeline.buckets[1].count, 2);

    let shares = analysis.categories.unwrap();
    assert_eq!(shares[0].category_id, travel);
    assert_eq!(shares[0].percentage, 70.0);
    assert_eq!(shares[1].category_name, "Food & Dining");
    assert_eq!(shares[1].percentage, 30.0);

    let frequent = analysis.most_frequent.unwrap();
    assert_eq!(frequent.category_id, food);
    assert_eq!(frequent.count, 3);
    assert_eq!(frequent.total, cents(6_000));

    let february = engine
        .analyze_expenses(
            user,
            &ExpenseAnalysisFilter {
                start_date: Some(day(2025, 2, 1)),
                end_date: Some(day(2025, 2, 28)),
                category_id: Some(food),
                period: AnalysisPeriod::Day,
            },
        )
        .await
        .unwrap();
    let totals = february.totals.unwrap();
    assert_eq!(totals.total, cents(3_000));
    assert_eq!(totals.count, 1);
    assert_eq!(february.timeline.unwrap().buckets[0].period, "2025-02-10");
}

#[tokio::test]
async fn analysis_of_nothing_is_zeroed() {
    let engine = common::engine().await;

    let analysis = engine
        .analyze_expenses(Uuid::new_v4(), &ExpenseAnalysisFilter::default())
        .await
        .unwrap();
    let totals = analysis.totals.unwrap();
    assert_eq!(totals.total, cents(0));
    assert_eq!(totals.count, 0);
    assert_eq!(totals.average, cents(0));
    assert!(analysis.timeline.unwrap().buckets.is_empty());
    assert!(analysis.categories.unwrap().is_empty());
    assert!(analysis.most_frequent.is_none());
}
