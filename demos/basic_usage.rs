//! Basic usage example for knowledge retrieval

use knowledge_retrieval::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize observability
    knowledge_retrieval::observability::init_observability("info", "pretty");

    println!("=== Knowledge Retrieval Basic Usage Example ===\n");

    let config = Config::default_config();

    println!("1. Seeding the document store...");

    let store = Arc::new(InMemoryDocumentStore::new());
    let articles = vec![
        KnowledgeDocument::new(
            1,
            "Return Policy",
            "Items may be returned within 30 days for a full refund.",
        )
        .with_category("returns"),
        KnowledgeDocument::new(
            2,
            "Shipping Carriers",
            "We ship with UPS and FedEx. Tracking numbers are emailed.",
        )
        .with_category("shipping"),
        KnowledgeDocument::new(
            3,
            "Password Reset",
            "Use the forgot password link on the sign in page.",
        )
        .with_category("account"),
    ];
    for article in articles {
        let category = article.category.as_deref().unwrap_or("uncategorized");
        println!("   ✓ {} ({})", article.title, category);
        store.upsert_article("acme", article);
    }

    let index = Arc::new(IndexManager::new(&config.retrieval, store));
    let stats = index.refresh("acme").await?;
    println!(
        "   ✓ Index built: {} documents, {} terms\n",
        stats.document_count, stats.vocabulary_size
    );

    println!("2. Searching...");

    let query = SearchQuery::new("how can I get a refund").with_top_k(3);
    for result in index.search("acme", &query).await? {
        println!(
            "   {} (score {:.3}, relevance {}%)",
            result.document.title, result.score, result.relevance_score
        );
    }

    println!("\n3. Adding an article...");

    let stats = index
        .add_documents(
            "acme",
            vec![KnowledgeDocument::new(
                4,
                "Gift Cards",
                "Gift cards never expire and can be redeemed online.",
            )],
        )
        .await?;
    println!(
        "   ✓ Rebuilt as generation {} with {} documents",
        stats.generation, stats.document_count
    );

    println!("\n4. Building RAG context...");

    let rag = RagAssembler::new(index.clone(), config.rag.clone());
    let context = rag.build_default_context("acme", "do gift cards expire?").await;
    println!(
        "   Found {} articles in {}ms",
        context.total_articles_found, context.retrieval_time_ms
    );
    println!("\n{}", rag.format_context(&context));

    println!("=== Example completed successfully! ===");

    Ok(())
}
