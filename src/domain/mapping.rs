// Mapping from database rows to domain models

use entities::{books, reading_progress};

use super::models::{Document, ReadingProgress};

/// Negative or zero counts coming from the table are clamped rather than trusted.
fn page_from_column(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

pub fn page_to_column(page: u32) -> i32 {
    i32::try_from(page).unwrap_or(i32::MAX)
}

pub fn map_book_to_document(book: books::Model) -> Document {
    Document {
        id: book.id,
        title: book.title,
        page_count: page_from_column(book.page_count),
        price_minor: book.price_minor,
        currency: book.currency,
    }
}

pub fn map_progress(row: reading_progress::Model) -> ReadingProgress {
    ReadingProgress {
        viewer_id: row.user_id,
        document_id: row.book_id,
        current_page: page_from_column(row.current_page).max(1),
        has_paid: row.has_paid,
        payment_reference: row.payment_reference,
        paid_at: row.paid_at,
        last_accessed_at: row.last_accessed_at,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    #[test]
    fn book_with_negative_page_count_has_no_pages() {
        let doc = map_book_to_document(books::Model {
            id: Uuid::new_v4(),
            title: "Broken".into(),
            page_count: -4,
            price_minor: 0,
            currency: "NGN".into(),
            created_at: Utc::now(),
        });
        assert_eq!(doc.page_count, 0);
        assert!(!doc.contains_page(1));
    }

    #[test]
    fn progress_page_never_below_one() {
        let now = Utc::now();
        let progress = map_progress(reading_progress::Model {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            current_page: 0,
            has_paid: true,
            payment_reference: Some("ref-1".into()),
            paid_at: Some(now),
            last_accessed_at: now,
        });
        assert_eq!(progress.current_page, 1);
        assert!(progress.has_paid);
        assert_eq!(progress.payment_reference.as_deref(), Some("ref-1"));
    }

    #[test]
    fn page_column_saturates() {
        assert_eq!(page_to_column(7), 7);
        assert_eq!(page_to_column(u32::MAX), i32::MAX);
    }
}
